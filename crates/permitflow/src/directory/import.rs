//! Administrative CSV import for authority and category reference data.
//!
//! Deployments outside the builtin sample ship two files: `categories.csv`
//! describing fee schedules and required documents, and `authorities.csv`
//! listing which categories each authority accepts. List-valued columns use
//! `|` between entries; processing-day overrides use `category:days` pairs.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use super::domain::{
    Authority, AuthorityDirectory, AuthorityId, CategoryId, DocumentKind, FeeSchedule,
    SubmissionCategory,
};

/// Error enumeration for reference data import failures.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read reference data: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid reference data csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: field '{field}' has invalid value '{value}'")]
    InvalidField {
        row: usize,
        field: &'static str,
        value: String,
    },
    #[error("row {row}: unknown document kind '{kind}'")]
    UnknownDocumentKind { row: usize, kind: String },
    #[error("duplicate category id '{0}'")]
    DuplicateCategory(String),
    #[error("duplicate authority id '{0}'")]
    DuplicateAuthority(String),
    #[error("authority '{authority}' references unknown category '{category}'")]
    UnknownCategoryReference { authority: String, category: String },
}

/// Builds a directory from the two reference files, cross-checking that
/// every category an authority accepts or overrides was actually imported.
pub fn directory_from_readers<A: Read, C: Read>(
    authorities: A,
    categories: C,
) -> Result<AuthorityDirectory, ImportError> {
    let categories = categories_from_reader(categories)?;
    let authorities = authorities_from_reader(authorities)?;

    let known: Vec<&CategoryId> = categories.iter().map(|category| &category.id).collect();
    for authority in &authorities {
        for category in authority
            .accepted_categories
            .iter()
            .chain(authority.processing_day_overrides.keys())
        {
            if !known.contains(&category) {
                return Err(ImportError::UnknownCategoryReference {
                    authority: authority.id.0.clone(),
                    category: category.0.clone(),
                });
            }
        }
    }

    Ok(AuthorityDirectory::new(authorities, categories))
}

/// File-path convenience over [`directory_from_readers`].
pub fn directory_from_paths<P: AsRef<Path>>(
    authorities: P,
    categories: P,
) -> Result<AuthorityDirectory, ImportError> {
    let authorities = std::fs::File::open(authorities)?;
    let categories = std::fs::File::open(categories)?;
    directory_from_readers(authorities, categories)
}

pub fn categories_from_reader<R: Read>(reader: R) -> Result<Vec<SubmissionCategory>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut categories: Vec<SubmissionCategory> = Vec::new();
    for (index, record) in csv_reader.deserialize::<CategoryRow>().enumerate() {
        let row = record?;
        let category = row.into_category(index + 1)?;
        if categories.iter().any(|known| known.id == category.id) {
            return Err(ImportError::DuplicateCategory(category.id.0));
        }
        categories.push(category);
    }

    Ok(categories)
}

pub fn authorities_from_reader<R: Read>(reader: R) -> Result<Vec<Authority>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut authorities: Vec<Authority> = Vec::new();
    for (index, record) in csv_reader.deserialize::<AuthorityRow>().enumerate() {
        let row = record?;
        let authority = row.into_authority(index + 1)?;
        if authorities.iter().any(|known| known.id == authority.id) {
            return Err(ImportError::DuplicateAuthority(authority.id.0));
        }
        authorities.push(authority);
    }

    Ok(authorities)
}

#[derive(Debug, Deserialize)]
struct CategoryRow {
    id: String,
    name: String,
    typical_processing_days: String,
    required_documents: String,
    currency: String,
    base_fee: String,
    grace_period_days: String,
    late_surcharge: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    expedite_surcharge: Option<String>,
}

impl CategoryRow {
    fn into_category(self, row: usize) -> Result<SubmissionCategory, ImportError> {
        let typical_processing_days =
            parse_days(&self.typical_processing_days, row, "typical_processing_days")?;
        let grace_period_days =
            i64::from(parse_days(&self.grace_period_days, row, "grace_period_days")?);

        let mut required_documents = Vec::new();
        for entry in list_entries(&self.required_documents) {
            let kind = DocumentKind::from_str(entry).map_err(|unknown| {
                ImportError::UnknownDocumentKind {
                    row,
                    kind: unknown.0,
                }
            })?;
            if !required_documents.contains(&kind) {
                required_documents.push(kind);
            }
        }

        let fees = FeeSchedule {
            currency: self.currency,
            base_fee: parse_amount(&self.base_fee, row, "base_fee")?,
            grace_period_days,
            late_surcharge: parse_amount(&self.late_surcharge, row, "late_surcharge")?,
            expedite_surcharge: match self.expedite_surcharge {
                Some(raw) => parse_amount(&raw, row, "expedite_surcharge")?,
                None => Decimal::ZERO,
            },
        };

        Ok(SubmissionCategory {
            id: CategoryId(self.id),
            name: self.name,
            typical_processing_days,
            required_documents,
            fees,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AuthorityRow {
    id: String,
    name: String,
    jurisdiction: String,
    accepted_categories: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    processing_day_overrides: Option<String>,
}

impl AuthorityRow {
    fn into_authority(self, row: usize) -> Result<Authority, ImportError> {
        let accepted_categories: Vec<CategoryId> = list_entries(&self.accepted_categories)
            .map(|entry| CategoryId(entry.to_string()))
            .collect();

        let mut processing_day_overrides = BTreeMap::new();
        if let Some(raw) = &self.processing_day_overrides {
            for entry in list_entries(raw) {
                let (category, days) =
                    entry
                        .split_once(':')
                        .ok_or_else(|| ImportError::InvalidField {
                            row,
                            field: "processing_day_overrides",
                            value: entry.to_string(),
                        })?;
                let days = parse_days(days, row, "processing_day_overrides")?;
                processing_day_overrides.insert(CategoryId(category.trim().to_string()), days);
            }
        }

        Ok(Authority {
            id: AuthorityId(self.id),
            name: self.name,
            jurisdiction: self.jurisdiction,
            accepted_categories,
            processing_day_overrides,
        })
    }
}

fn list_entries(raw: &str) -> impl Iterator<Item = &str> {
    raw.split('|')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
}

fn parse_days(raw: &str, row: usize, field: &'static str) -> Result<u32, ImportError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ImportError::InvalidField {
            row,
            field,
            value: raw.to_string(),
        })
}

fn parse_amount(raw: &str, row: usize, field: &'static str) -> Result<Decimal, ImportError> {
    Decimal::from_str(raw.trim()).map_err(|_| ImportError::InvalidField {
        row,
        field,
        value: raw.to_string(),
    })
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
