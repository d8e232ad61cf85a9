//! HTML pages of the browser client.

use rocket::fs::NamedFile;
use rocket::State;

use crate::auth::SessionUser;
use crate::config::ClientConfig;
use crate::error::ApiError;

#[get("/")]
pub async fn index(client: &State<ClientConfig>) -> Result<NamedFile, ApiError> {
    serve_page(client, "index.html").await
}

#[get("/newProject")]
pub async fn new_project(
    client: &State<ClientConfig>,
    user: Option<SessionUser>,
) -> Result<NamedFile, ApiError> {
    log_visitor("newProject", user.as_ref());
    serve_page(client, "newProject.html").await
}

#[get("/newEngineer")]
pub async fn new_engineer(
    client: &State<ClientConfig>,
    user: Option<SessionUser>,
) -> Result<NamedFile, ApiError> {
    log_visitor("newEngineer", user.as_ref());
    serve_page(client, "newEngineer.html").await
}

fn log_visitor(page: &str, user: Option<&SessionUser>) {
    match user {
        Some(user) => log::info!("{} opened by '{}'", page, user.git_handle),
        None => log::info!("{} opened by a signed-out visitor", page),
    }
}

async fn serve_page(client: &ClientConfig, file_name: &str) -> Result<NamedFile, ApiError> {
    let path = client.page(file_name);
    NamedFile::open(&path).await.map_err(|err| {
        log::debug!("page {} unavailable: {}", path.display(), err);
        ApiError::NotFound(format!("Page '{}' not found", file_name))
    })
}
