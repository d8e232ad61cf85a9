use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use rocket_db_pools::sqlx;
use rocket_okapi::openapi;

use crate::error::ApiError;
use crate::models::{NewProject, ProjectListing};
use crate::routes::helpers::created_response;
use crate::store::engineers::missing_handles;
use crate::store::{self, ProjectDraft, StoreError};
use crate::uploads::ImageService;

/// List every project with its school and engineers
#[openapi(tag = "Projects")]
#[get("/projects/data")]
pub async fn list_projects(
    pool: &State<sqlx::PgPool>,
) -> Result<Json<Vec<ProjectListing>>, ApiError> {
    let projects = store::list_projects(pool.inner()).await?;
    Ok(Json(projects))
}

/// Get a single project by id
#[openapi(tag = "Projects")]
#[get("/projects/data/<id>")]
pub async fn get_project(
    id: i32,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<ProjectListing>, ApiError> {
    store::get_project(pool.inner(), id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))
}

/// Create a project, or return the existing one with the same title
///
/// Responds `201` when the project was created and `200` when a project
/// with the submitted title already existed.
#[openapi(tag = "Projects")]
#[post("/projects/data", data = "<request>")]
pub async fn create_project(
    request: Json<NewProject>,
    pool: &State<sqlx::PgPool>,
    images: &State<ImageService>,
) -> Result<status::Custom<Json<ProjectListing>>, ApiError> {
    let input = request.into_inner();

    // An existing title wins over any other field, valid or not.
    let title = input.title.trim();
    if !title.is_empty() {
        if let Some(existing) = store::find_project_by_title(pool.inner(), title).await? {
            log::debug!("project '{}' already exists (id {})", existing.title, existing.id);
            return Ok(created_response(store::Created::Existing(existing)));
        }
    }

    let mut draft = ProjectDraft::parse(input)?;

    let unknown = missing_handles(pool.inner(), &draft.engineers).await?;
    if !unknown.is_empty() {
        return Err(StoreError::UnknownEngineers(unknown).into());
    }

    if let Some(source) = draft.image.take() {
        draft.image = Some(images.store_image(&source).await?);
    }

    let created = store::create_project(pool.inner(), &draft).await?;
    Ok(created_response(created))
}
