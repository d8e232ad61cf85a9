use rocket_db_pools::{sqlx, Database};

/// Primary Postgres pool, configured under `databases.hackdin_db`.
#[derive(Database)]
#[database("hackdin_db")]
pub struct HackdinDb(sqlx::PgPool);
