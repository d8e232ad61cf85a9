//! HTTP route handlers grouped by resource.
//!
//! JSON data handlers are annotated with `#[openapi]` so `rocket_okapi`
//! can derive an OpenAPI document; page and session handlers are mounted
//! as plain Rocket routes.

pub mod engineers;
pub mod health;
pub(crate) mod helpers;
pub mod pages;
pub mod params;
pub mod projects;
