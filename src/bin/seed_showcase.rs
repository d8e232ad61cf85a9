use std::fs;
use std::path::PathBuf;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use hackdin::store::{self, Showcase};

#[derive(Parser, Debug)]
#[command(
    name = "seed_showcase",
    about = "Load engineers and projects from a JSON file into the showcase database"
)]
struct Args {
    /// JSON file shaped like `{ "engineers": [...], "projects": [...] }`.
    #[arg(long)]
    file: PathBuf,

    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let raw = fs::read_to_string(&args.file)?;
    let showcase: Showcase = serde_json::from_str(&raw)?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    hackdin::run_migrations(&pool).await?;

    let report = store::seed_showcase(&pool, showcase).await?;
    pool.close().await;

    println!(
        "engineers: {} created, {} existing",
        report.engineers.created, report.engineers.existing
    );
    println!(
        "projects: {} created, {} existing",
        report.projects.created, report.projects.existing
    );
    if report.skipped > 0 {
        println!("skipped: {}", report.skipped);
    }

    Ok(())
}
