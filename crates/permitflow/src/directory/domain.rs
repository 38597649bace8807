use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for regulatory authorities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuthorityId(pub String);

/// Identifier wrapper for submission categories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(pub String);

/// Closed set of drawing and paperwork types an authority can require.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    ArchitecturalPlan,
    StructuralPlan,
    SitePlan,
    FireSafetyPlan,
    LandTitle,
    Calculation,
    ApplicationForm,
    SupportingLetter,
}

impl DocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentKind::ArchitecturalPlan => "architectural_plan",
            DocumentKind::StructuralPlan => "structural_plan",
            DocumentKind::SitePlan => "site_plan",
            DocumentKind::FireSafetyPlan => "fire_safety_plan",
            DocumentKind::LandTitle => "land_title",
            DocumentKind::Calculation => "calculation",
            DocumentKind::ApplicationForm => "application_form",
            DocumentKind::SupportingLetter => "supporting_letter",
        }
    }
}

/// Raised when reference data names a document kind outside the closed set.
#[derive(Debug, thiserror::Error)]
#[error("unknown document kind '{0}'")]
pub struct UnknownDocumentKind(pub String);

impl FromStr for DocumentKind {
    type Err = UnknownDocumentKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "architectural_plan" => Ok(Self::ArchitecturalPlan),
            "structural_plan" => Ok(Self::StructuralPlan),
            "site_plan" => Ok(Self::SitePlan),
            "fire_safety_plan" => Ok(Self::FireSafetyPlan),
            "land_title" => Ok(Self::LandTitle),
            "calculation" => Ok(Self::Calculation),
            "application_form" => Ok(Self::ApplicationForm),
            "supporting_letter" => Ok(Self::SupportingLetter),
            other => Err(UnknownDocumentKind(other.to_string())),
        }
    }
}

/// Per-category fee table. Surcharges apply on top of the base fee; the
/// grace period is measured in calendar days from submission creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub currency: String,
    pub base_fee: Decimal,
    pub grace_period_days: i64,
    pub late_surcharge: Decimal,
    pub expedite_surcharge: Decimal,
}

/// A kind of regulatory submission an authority processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionCategory {
    pub id: CategoryId,
    pub name: String,
    pub typical_processing_days: u32,
    pub required_documents: Vec<DocumentKind>,
    pub fees: FeeSchedule,
}

/// Regulatory body receiving submissions, with per-category overrides of the
/// published processing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub id: AuthorityId,
    pub name: String,
    pub jurisdiction: String,
    pub accepted_categories: Vec<CategoryId>,
    pub processing_day_overrides: BTreeMap<CategoryId, u32>,
}

impl Authority {
    pub fn accepts(&self, category: &CategoryId) -> bool {
        self.accepted_categories.contains(category)
    }
}

/// Immutable lookup of authorities and categories, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct AuthorityDirectory {
    authorities: BTreeMap<AuthorityId, Authority>,
    categories: BTreeMap<CategoryId, SubmissionCategory>,
}

impl AuthorityDirectory {
    pub fn new(authorities: Vec<Authority>, categories: Vec<SubmissionCategory>) -> Self {
        Self {
            authorities: authorities
                .into_iter()
                .map(|authority| (authority.id.clone(), authority))
                .collect(),
            categories: categories
                .into_iter()
                .map(|category| (category.id.clone(), category))
                .collect(),
        }
    }

    pub fn authority(&self, id: &AuthorityId) -> Option<&Authority> {
        self.authorities.get(id)
    }

    pub fn category(&self, id: &CategoryId) -> Option<&SubmissionCategory> {
        self.categories.get(id)
    }

    /// Processing days the authority commits to for a category: the
    /// authority override when one is published, the category default
    /// otherwise.
    pub fn processing_days(&self, authority: &AuthorityId, category: &CategoryId) -> Option<u32> {
        let authority = self.authorities.get(authority)?;
        if let Some(days) = authority.processing_day_overrides.get(category) {
            return Some(*days);
        }
        self.categories
            .get(category)
            .map(|category| category.typical_processing_days)
    }

    pub fn authorities(&self) -> impl Iterator<Item = &Authority> {
        self.authorities.values()
    }

    pub fn categories(&self) -> impl Iterator<Item = &SubmissionCategory> {
        self.categories.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_beats_category_default() {
        let directory = AuthorityDirectory::builtin();
        let dbkl = AuthorityId("dbkl".to_string());
        let building_plan = CategoryId("building-plan".to_string());

        let category_default = directory
            .category(&building_plan)
            .expect("builtin category")
            .typical_processing_days;
        let committed = directory
            .processing_days(&dbkl, &building_plan)
            .expect("override present");

        assert_ne!(committed, category_default);
        assert_eq!(committed, 60);
    }

    #[test]
    fn default_applies_when_no_override_published() {
        let directory = AuthorityDirectory::builtin();
        let mbpj = AuthorityId("mbpj".to_string());
        let renovation = CategoryId("renovation-permit".to_string());

        assert_eq!(directory.processing_days(&mbpj, &renovation), Some(14));
    }

    #[test]
    fn unknown_authority_yields_none() {
        let directory = AuthorityDirectory::builtin();
        assert_eq!(
            directory.processing_days(
                &AuthorityId("nowhere".to_string()),
                &CategoryId("building-plan".to_string())
            ),
            None
        );
    }

    #[test]
    fn document_kind_round_trips_from_label() {
        for kind in [
            DocumentKind::ArchitecturalPlan,
            DocumentKind::StructuralPlan,
            DocumentKind::SitePlan,
            DocumentKind::FireSafetyPlan,
            DocumentKind::LandTitle,
            DocumentKind::Calculation,
            DocumentKind::ApplicationForm,
            DocumentKind::SupportingLetter,
        ] {
            assert_eq!(kind.label().parse::<DocumentKind>().expect("parses"), kind);
        }

        assert!("blueprints".parse::<DocumentKind>().is_err());
    }
}
