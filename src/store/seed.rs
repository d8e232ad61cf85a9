//! Bulk loading of a showcase document into the store.

use rocket_db_pools::sqlx::PgPool;
use serde::Deserialize;

use crate::models::{NewEngineer, NewProject};
use crate::store::{EngineerDraft, ProjectDraft, StoreError, StoreResult};
use crate::store::{create_project, find_or_create_engineer};

/// Shape of a seed file: `{ "engineers": [...], "projects": [...] }`.
#[derive(Debug, Default, Deserialize)]
pub struct Showcase {
    #[serde(default)]
    pub engineers: Vec<NewEngineer>,
    #[serde(default)]
    pub projects: Vec<NewProject>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub created: usize,
    pub existing: usize,
}

impl Tally {
    fn record(&mut self, is_new: bool) {
        if is_new {
            self.created += 1;
        } else {
            self.existing += 1;
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub engineers: Tally,
    pub projects: Tally,
    /// Entries that failed validation or named unknown engineers.
    pub skipped: usize,
}

/// Load `showcase` through the fetch-or-create store calls.
///
/// Engineers go in first so projects can link to them. Invalid entries are
/// logged and skipped; database failures abort the run.
pub async fn seed_showcase(pool: &PgPool, showcase: Showcase) -> StoreResult<SeedReport> {
    let mut report = SeedReport::default();

    for input in showcase.engineers {
        let draft = match EngineerDraft::parse(input) {
            Ok(draft) => draft,
            Err(err) => {
                log::warn!("skipping engineer: {}", err);
                report.skipped += 1;
                continue;
            }
        };
        let created = find_or_create_engineer(pool, &draft).await?;
        report.engineers.record(created.is_new());
    }

    for input in showcase.projects {
        let draft = match ProjectDraft::parse(input) {
            Ok(draft) => draft,
            Err(err) => {
                log::warn!("skipping project: {}", err);
                report.skipped += 1;
                continue;
            }
        };
        match create_project(pool, &draft).await {
            Ok(created) => report.projects.record(created.is_new()),
            Err(err @ StoreError::UnknownEngineers(_)) => {
                log::warn!("skipping project '{}': {}", draft.title, err);
                report.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_created_and_existing() {
        let mut tally = Tally::default();
        tally.record(true);
        tally.record(false);
        tally.record(true);
        assert_eq!(tally, Tally { created: 2, existing: 1 });
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let showcase: Showcase = serde_json::from_str(r#"{ "engineers": [] }"#).expect("parse");
        assert!(showcase.engineers.is_empty());
        assert!(showcase.projects.is_empty());
    }
}
