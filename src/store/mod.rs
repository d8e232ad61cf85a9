//! Relational storage for projects, engineers and schools.
//!
//! Route handlers, the GitHub callback and the seeding CLI all go through
//! these functions. Uniqueness (project title, engineer handle, school name)
//! is enforced by the database; fetch-or-create operations insert with
//! `ON CONFLICT DO NOTHING` and fall back to reading the winning row, so
//! concurrent creators converge on a single record.

pub mod engineers;
pub mod projects;
pub mod schools;
pub mod seed;

use thiserror::Error;

pub use engineers::{EngineerDraft, find_engineer_by_handle, find_or_create_engineer, list_engineers};
pub use projects::{
    ProjectDraft, create_project, find_project_by_title, get_project, list_projects,
    projects_for_engineer,
};
pub use schools::find_or_create_school;
pub use seed::{SeedReport, Showcase, Tally, seed_showcase};

use crate::error::ApiError;

/// Errors raised while validating or persisting records.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Invalid(String),
    #[error("unknown engineers: {}", .0.join(", "))]
    UnknownEngineers(Vec<String>),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Invalid(msg) => ApiError::BadRequest(msg),
            StoreError::UnknownEngineers(_) => ApiError::BadRequest(err.to_string()),
            StoreError::Database(e) => ApiError::from(e),
        }
    }
}

/// Outcome of a fetch-or-create call.
#[derive(Debug, Clone)]
pub enum Created<T> {
    /// This call inserted the record.
    New(T),
    /// A record with the same key already existed and was returned untouched.
    Existing(T),
}

impl<T> Created<T> {
    pub fn is_new(&self) -> bool {
        matches!(self, Created::New(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Created::New(value) | Created::Existing(value) => value,
        }
    }
}

/// Trim `value`, mapping blank strings to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
