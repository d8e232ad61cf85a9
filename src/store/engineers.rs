use rocket_db_pools::sqlx::{self, PgConnection, PgPool};

use super::{Created, StoreError, StoreResult, non_blank};
use crate::models::{Engineer, NewEngineer};

const MAX_HANDLE_LEN: usize = 39;

/// Validated engineer fields ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineerDraft {
    pub name: String,
    pub git_handle: String,
    pub email: Option<String>,
    pub image: Option<String>,
}

impl EngineerDraft {
    pub fn parse(input: NewEngineer) -> StoreResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::Invalid("name is required".into()));
        }

        let git_handle = validate_handle(&input.git_handle)?;

        Ok(Self {
            name,
            git_handle,
            email: non_blank(input.email),
            image: non_blank(input.image),
        })
    }
}

/// Check a GitHub handle: ASCII alphanumerics and hyphens, at most 39 chars.
pub fn validate_handle(handle: &str) -> StoreResult<String> {
    let handle = handle.trim();
    if handle.is_empty() {
        return Err(StoreError::Invalid("gitHandle is required".into()));
    }
    if handle.len() > MAX_HANDLE_LEN
        || !handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(StoreError::Invalid(format!("invalid gitHandle '{handle}'")));
    }
    Ok(handle.to_string())
}

pub async fn list_engineers(pool: &PgPool) -> Result<Vec<Engineer>, sqlx::Error> {
    sqlx::query_as(
        r#"SELECT id, name, git_handle, email, image, created_at
           FROM engineers
           ORDER BY name ASC, id ASC"#,
    )
    .fetch_all(pool)
    .await
}

/// Case-insensitive lookup by GitHub handle.
pub async fn find_engineer_by_handle(
    pool: &PgPool,
    git_handle: &str,
) -> Result<Option<Engineer>, sqlx::Error> {
    sqlx::query_as(
        r#"SELECT id, name, git_handle, email, image, created_at
           FROM engineers
           WHERE lower(git_handle) = lower($1)"#,
    )
    .bind(git_handle)
    .fetch_optional(pool)
    .await
}

/// Return the engineer with `draft.git_handle`, inserting `draft` if none exists.
pub async fn find_or_create_engineer(
    pool: &PgPool,
    draft: &EngineerDraft,
) -> Result<Created<Engineer>, sqlx::Error> {
    let inserted: Option<Engineer> = sqlx::query_as(
        r#"INSERT INTO engineers (name, git_handle, email, image)
           VALUES ($1, $2, $3, $4)
           ON CONFLICT ((lower(git_handle))) DO NOTHING
           RETURNING id, name, git_handle, email, image, created_at"#,
    )
    .bind(&draft.name)
    .bind(&draft.git_handle)
    .bind(&draft.email)
    .bind(&draft.image)
    .fetch_optional(pool)
    .await?;

    if let Some(engineer) = inserted {
        log::info!(
            "created engineer '{}' (id {})",
            engineer.git_handle,
            engineer.id
        );
        return Ok(Created::New(engineer));
    }

    let existing = find_engineer_by_handle(pool, &draft.git_handle)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    Ok(Created::Existing(existing))
}

/// Handles from `handles` that match no engineer.
pub async fn missing_handles(pool: &PgPool, handles: &[String]) -> Result<Vec<String>, sqlx::Error> {
    if handles.is_empty() {
        return Ok(Vec::new());
    }

    let known: Vec<String> = sqlx::query_scalar(
        "SELECT lower(git_handle) FROM engineers WHERE lower(git_handle) = ANY($1)",
    )
    .bind(lowercased(handles))
    .fetch_all(pool)
    .await?;

    Ok(handles
        .iter()
        .filter(|handle| !known.contains(&handle.to_lowercase()))
        .cloned()
        .collect())
}

/// Map handles to engineer ids, failing with every handle that is unknown.
pub async fn resolve_engineer_ids(
    conn: &mut PgConnection,
    handles: &[String],
) -> StoreResult<Vec<i32>> {
    if handles.is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<(i32, String)> = sqlx::query_as(
        "SELECT id, lower(git_handle) FROM engineers WHERE lower(git_handle) = ANY($1)",
    )
    .bind(lowercased(handles))
    .fetch_all(&mut *conn)
    .await?;

    let mut ids = Vec::with_capacity(handles.len());
    let mut unknown = Vec::new();
    for handle in handles {
        let wanted = handle.to_lowercase();
        match rows.iter().find(|(_, known)| *known == wanted) {
            Some((id, _)) if !ids.contains(id) => ids.push(*id),
            Some(_) => {}
            None => unknown.push(handle.clone()),
        }
    }

    if unknown.is_empty() {
        Ok(ids)
    } else {
        Err(StoreError::UnknownEngineers(unknown))
    }
}

fn lowercased(handles: &[String]) -> Vec<String> {
    handles.iter().map(|h| h.to_lowercase()).collect()
}
