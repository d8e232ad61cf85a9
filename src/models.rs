use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::FromRow;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ===== Stored Records =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Participant profile, keyed by GitHub handle.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Engineer {
    pub id: i32,
    pub name: String,
    pub git_handle: String,
    pub email: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A project joined with its school and the names of its engineers.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListing {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub school: Option<String>,
    pub engineers: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ===== Request Payloads =====

/// Body of `POST /projects/data`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Source image URL; uploaded to the image host when one is configured.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    /// GitHub handles of existing engineers to link to the project.
    #[serde(default)]
    pub engineers: Vec<String>,
}

/// Body of `POST /engineers/data`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewEngineer {
    pub name: String,
    pub git_handle: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

// ===== Response Wrappers =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
