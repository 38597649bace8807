use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::domain::{
    Authority, AuthorityDirectory, AuthorityId, CategoryId, DocumentKind, FeeSchedule,
    SubmissionCategory,
};

impl AuthorityDirectory {
    /// Reference data covering the Klang Valley authorities the product
    /// launched with. Deployments with their own registries load CSV data
    /// through `directory::import` instead.
    pub fn builtin() -> Self {
        Self::new(builtin_authorities(), builtin_categories())
    }
}

fn ringgit(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn category_id(raw: &str) -> CategoryId {
    CategoryId(raw.to_string())
}

fn builtin_categories() -> Vec<SubmissionCategory> {
    vec![
        SubmissionCategory {
            id: category_id("development-order"),
            name: "Development Order (Kebenaran Merancang)".to_string(),
            typical_processing_days: 30,
            required_documents: vec![
                DocumentKind::SitePlan,
                DocumentKind::ArchitecturalPlan,
                DocumentKind::LandTitle,
                DocumentKind::ApplicationForm,
            ],
            fees: FeeSchedule {
                currency: "MYR".to_string(),
                base_fee: ringgit(85_000),
                grace_period_days: 14,
                late_surcharge: ringgit(25_000),
                expedite_surcharge: ringgit(40_000),
            },
        },
        SubmissionCategory {
            id: category_id("building-plan"),
            name: "Building Plan Approval (Pelan Bangunan)".to_string(),
            typical_processing_days: 45,
            required_documents: vec![
                DocumentKind::ArchitecturalPlan,
                DocumentKind::StructuralPlan,
                DocumentKind::Calculation,
                DocumentKind::ApplicationForm,
            ],
            fees: FeeSchedule {
                currency: "MYR".to_string(),
                base_fee: ringgit(120_000),
                grace_period_days: 14,
                late_surcharge: ringgit(30_000),
                expedite_surcharge: ringgit(60_000),
            },
        },
        SubmissionCategory {
            id: category_id("fire-safety"),
            name: "Fire Safety Certification".to_string(),
            typical_processing_days: 21,
            required_documents: vec![
                DocumentKind::FireSafetyPlan,
                DocumentKind::ArchitecturalPlan,
                DocumentKind::ApplicationForm,
            ],
            fees: FeeSchedule {
                currency: "MYR".to_string(),
                base_fee: ringgit(40_000),
                grace_period_days: 7,
                late_surcharge: ringgit(15_000),
                expedite_surcharge: ringgit(20_000),
            },
        },
        SubmissionCategory {
            id: category_id("renovation-permit"),
            name: "Renovation Permit".to_string(),
            typical_processing_days: 14,
            required_documents: vec![
                DocumentKind::ArchitecturalPlan,
                DocumentKind::ApplicationForm,
            ],
            fees: FeeSchedule {
                currency: "MYR".to_string(),
                base_fee: ringgit(30_000),
                grace_period_days: 7,
                late_surcharge: ringgit(10_000),
                expedite_surcharge: ringgit(15_000),
            },
        },
    ]
}

fn builtin_authorities() -> Vec<Authority> {
    vec![
        Authority {
            id: AuthorityId("dbkl".to_string()),
            name: "Dewan Bandaraya Kuala Lumpur".to_string(),
            jurisdiction: "Kuala Lumpur".to_string(),
            accepted_categories: vec![
                category_id("development-order"),
                category_id("building-plan"),
                category_id("renovation-permit"),
            ],
            processing_day_overrides: BTreeMap::from([(category_id("building-plan"), 60)]),
        },
        Authority {
            id: AuthorityId("mbpj".to_string()),
            name: "Majlis Bandaraya Petaling Jaya".to_string(),
            jurisdiction: "Petaling Jaya, Selangor".to_string(),
            accepted_categories: vec![
                category_id("development-order"),
                category_id("building-plan"),
                category_id("renovation-permit"),
            ],
            processing_day_overrides: BTreeMap::from([(category_id("development-order"), 21)]),
        },
        Authority {
            id: AuthorityId("bomba".to_string()),
            name: "Jabatan Bomba dan Penyelamat Malaysia".to_string(),
            jurisdiction: "Federal".to_string(),
            accepted_categories: vec![category_id("fire-safety")],
            processing_day_overrides: BTreeMap::new(),
        },
    ]
}
