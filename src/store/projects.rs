use rocket_db_pools::sqlx::{self, PgPool};

use super::engineers::{resolve_engineer_ids, validate_handle};
use super::schools::find_or_create_school;
use super::{Created, StoreError, StoreResult, non_blank};
use crate::models::{NewProject, ProjectListing};

/// Projects joined with their school and engineer names. Callers append a
/// `WHERE` clause (or nothing) followed by [`LISTING_TAIL`].
const LISTING_SELECT: &str = r#"
    SELECT p.id, p.title, p.description, p.image, s.name AS school,
           COALESCE(
               array_agg(e.name ORDER BY e.name) FILTER (WHERE e.id IS NOT NULL),
               ARRAY[]::TEXT[]
           ) AS engineers,
           p.created_at
    FROM projects p
    LEFT JOIN schools s ON s.id = p.school_id
    LEFT JOIN project_engineers pe ON pe.project_id = p.id
    LEFT JOIN engineers e ON e.id = pe.engineer_id
"#;

const LISTING_TAIL: &str = r#"
    GROUP BY p.id, s.name
    ORDER BY p.created_at DESC, p.id DESC
"#;

/// Validated project fields. `image` holds whatever URL should be stored,
/// so callers swap in the hosted URL before calling [`create_project`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDraft {
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub school: Option<String>,
    pub engineers: Vec<String>,
}

impl ProjectDraft {
    pub fn parse(input: NewProject) -> StoreResult<Self> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(StoreError::Invalid("title is required".into()));
        }

        let mut engineers: Vec<String> = Vec::with_capacity(input.engineers.len());
        for handle in &input.engineers {
            let handle = validate_handle(handle)?;
            if !engineers.iter().any(|h| h.eq_ignore_ascii_case(&handle)) {
                engineers.push(handle);
            }
        }

        Ok(Self {
            title,
            description: non_blank(input.description),
            image: non_blank(input.image),
            school: non_blank(input.school),
            engineers,
        })
    }
}

pub async fn list_projects(pool: &PgPool) -> Result<Vec<ProjectListing>, sqlx::Error> {
    let sql = format!("{LISTING_SELECT}{LISTING_TAIL}");
    sqlx::query_as(&sql).fetch_all(pool).await
}

pub async fn get_project(pool: &PgPool, id: i32) -> Result<Option<ProjectListing>, sqlx::Error> {
    let sql = format!("{LISTING_SELECT} WHERE p.id = $1 {LISTING_TAIL}");
    sqlx::query_as(&sql).bind(id).fetch_optional(pool).await
}

pub async fn find_project_by_title(
    pool: &PgPool,
    title: &str,
) -> Result<Option<ProjectListing>, sqlx::Error> {
    let sql = format!("{LISTING_SELECT} WHERE p.title = $1 {LISTING_TAIL}");
    sqlx::query_as(&sql).bind(title).fetch_optional(pool).await
}

/// Every project the engineer with `git_handle` worked on.
pub async fn projects_for_engineer(
    pool: &PgPool,
    git_handle: &str,
) -> Result<Vec<ProjectListing>, sqlx::Error> {
    let sql = format!(
        r#"{LISTING_SELECT}
           WHERE p.id IN (
               SELECT member.project_id
               FROM project_engineers member
               JOIN engineers me ON me.id = member.engineer_id
               WHERE lower(me.git_handle) = lower($1)
           )
           {LISTING_TAIL}"#
    );
    sqlx::query_as(&sql).bind(git_handle).fetch_all(pool).await
}

/// Insert `draft` with its school and engineer links in one transaction.
///
/// When a project with the same title already exists, nothing is written and
/// the stored project is returned as [`Created::Existing`].
pub async fn create_project(
    pool: &PgPool,
    draft: &ProjectDraft,
) -> StoreResult<Created<ProjectListing>> {
    let mut tx = pool.begin().await?;

    let school_id = match &draft.school {
        Some(name) => Some(find_or_create_school(&mut *tx, name).await?.id),
        None => None,
    };

    let engineer_ids = resolve_engineer_ids(&mut *tx, &draft.engineers).await?;

    let inserted: Option<i32> = sqlx::query_scalar(
        r#"INSERT INTO projects (title, description, image, school_id)
           VALUES ($1, $2, $3, $4)
           ON CONFLICT (title) DO NOTHING
           RETURNING id"#,
    )
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&draft.image)
    .bind(school_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(project_id) = inserted else {
        tx.rollback().await?;
        log::debug!("project '{}' already exists", draft.title);
        let existing = find_project_by_title(pool, &draft.title)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        return Ok(Created::Existing(existing));
    };

    for engineer_id in &engineer_ids {
        sqlx::query(
            r#"INSERT INTO project_engineers (project_id, engineer_id)
               VALUES ($1, $2)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(project_id)
        .bind(engineer_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    log::info!(
        "created project '{}' (id {}, {} engineers)",
        draft.title,
        project_id,
        engineer_ids.len()
    );

    let listing = get_project(pool, project_id)
        .await?
        .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
    Ok(Created::New(listing))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, engineers: &[&str]) -> NewProject {
        NewProject {
            title: title.into(),
            description: Some(" Realtime transit map ".into()),
            image: Some(String::new()),
            school: None,
            engineers: engineers.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn parse_normalizes_fields() {
        let draft = ProjectDraft::parse(input("  Bus Buddy ", &["ada", "grace"])).expect("valid");
        assert_eq!(draft.title, "Bus Buddy");
        assert_eq!(draft.description.as_deref(), Some("Realtime transit map"));
        assert_eq!(draft.image, None);
        assert_eq!(draft.engineers, vec!["ada".to_string(), "grace".to_string()]);
    }

    #[test]
    fn parse_rejects_blank_titles() {
        assert!(matches!(
            ProjectDraft::parse(input("   ", &[])),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn parse_dedupes_handles_case_insensitively() {
        let draft = ProjectDraft::parse(input("Dup", &["Ada", "ada", "ADA", "grace"])).expect("valid");
        assert_eq!(draft.engineers, vec!["Ada".to_string(), "grace".to_string()]);
    }

    #[test]
    fn parse_rejects_malformed_handles() {
        assert!(ProjectDraft::parse(input("Bad", &["not a handle"])).is_err());
    }
}
