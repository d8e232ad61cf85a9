use rocket::response::{status, Redirect};
use rocket::serde::json::Json;
use rocket::State;
use rocket_db_pools::sqlx;
use rocket_okapi::openapi;

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::models::{DataResponse, Engineer, NewEngineer, ProjectListing};
use crate::routes::helpers::created_response;
use crate::routes::params::EngineerQuery;
use crate::store::{self, EngineerDraft};

/// List every engineer
#[openapi(tag = "Engineers")]
#[get("/engineers/data")]
pub async fn list_engineers(pool: &State<sqlx::PgPool>) -> Result<Json<Vec<Engineer>>, ApiError> {
    let engineers = store::list_engineers(pool.inner()).await?;
    Ok(Json(engineers))
}

/// Create an engineer, or return the existing one with the same GitHub handle
#[openapi(tag = "Engineers")]
#[post("/engineers/data", data = "<request>")]
pub async fn create_engineer(
    request: Json<NewEngineer>,
    pool: &State<sqlx::PgPool>,
) -> Result<status::Custom<Json<Engineer>>, ApiError> {
    let draft = EngineerDraft::parse(request.into_inner())?;
    let created = store::find_or_create_engineer(pool.inner(), &draft).await?;
    Ok(created_response(created))
}

/// Look up an engineer by GitHub handle
#[openapi(tag = "Engineers")]
#[get("/engineer?<query..>")]
pub async fn get_engineer(
    query: EngineerQuery,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<Engineer>, ApiError> {
    let handle = query.handle()?;
    find_engineer(pool.inner(), handle).await.map(Json)
}

/// Projects an engineer worked on
#[openapi(tag = "Engineers")]
#[get("/engineers/<git_handle>/projects")]
pub async fn get_engineer_projects(
    git_handle: String,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<DataResponse<Vec<ProjectListing>>>, ApiError> {
    let engineer = find_engineer(pool.inner(), &git_handle).await?;
    let projects = store::projects_for_engineer(pool.inner(), &engineer.git_handle).await?;
    Ok(Json(DataResponse::new(projects)))
}

#[derive(rocket::Responder)]
pub enum ProfileResponse {
    Found(Json<Engineer>),
    SignedOut(Redirect),
}

/// The signed-in engineer's own record. Signed-out visitors go home.
#[get("/profile")]
pub async fn profile(
    user: Option<SessionUser>,
    pool: &State<sqlx::PgPool>,
) -> Result<ProfileResponse, ApiError> {
    let Some(user) = user else {
        return Ok(ProfileResponse::SignedOut(Redirect::to("/")));
    };

    let engineer = find_engineer(pool.inner(), &user.git_handle).await?;
    if engineer.id != user.engineer_id {
        log::warn!(
            "session for '{}' names engineer {} but the handle belongs to {}",
            user.git_handle,
            user.engineer_id,
            engineer.id
        );
    }
    Ok(ProfileResponse::Found(Json(engineer)))
}

async fn find_engineer(pool: &sqlx::PgPool, git_handle: &str) -> Result<Engineer, ApiError> {
    store::find_engineer_by_handle(pool, git_handle)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Engineer '{}' not found", git_handle)))
}
