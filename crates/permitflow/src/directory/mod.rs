//! Immutable reference data describing regulatory authorities and the
//! submission categories they process. Loaded once at startup, either from
//! the builtin sample or from an administrative CSV import.

mod builtin;
pub mod domain;
pub mod import;

pub use domain::{
    Authority, AuthorityDirectory, AuthorityId, CategoryId, DocumentKind, FeeSchedule,
    SubmissionCategory, UnknownDocumentKind,
};
pub use import::ImportError;
