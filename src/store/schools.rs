use rocket_db_pools::sqlx::{self, PgConnection};

use crate::models::School;

/// Return the school named `name`, creating it if needed.
pub async fn find_or_create_school(
    conn: &mut PgConnection,
    name: &str,
) -> Result<School, sqlx::Error> {
    let inserted: Option<School> = sqlx::query_as(
        r#"INSERT INTO schools (name) VALUES ($1)
           ON CONFLICT (name) DO NOTHING
           RETURNING id, name, created_at"#,
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(school) = inserted {
        log::info!("created school '{}' (id {})", school.name, school.id);
        return Ok(school);
    }

    sqlx::query_as("SELECT id, name, created_at FROM schools WHERE name = $1")
        .bind(name)
        .fetch_one(&mut *conn)
        .await
}
