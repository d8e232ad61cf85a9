use hackdin::test_support::TestDatabase;
use sqlx::migrate::Migrator;

static TEST_MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn table_count(pool: &sqlx::PgPool, table: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'public' AND table_name = $1",
    )
    .bind(table)
    .fetch_one(pool)
    .await
    .expect("lookup succeeded")
}

#[tokio::test]
async fn migrations_apply_and_revert_cleanly() {
    let test_db = TestDatabase::new_from_env()
        .await
        .expect("failed to provision test database");

    let pool = test_db.pool_clone();

    TEST_MIGRATOR.run(&pool).await.expect("migrations run");
    for table in ["schools", "projects", "engineers", "project_engineers"] {
        assert_eq!(table_count(&pool, table).await, 1, "{table} should exist");
    }

    TEST_MIGRATOR
        .undo(&pool, 0)
        .await
        .expect("migrations revert");

    assert_eq!(
        table_count(&pool, "engineers").await,
        0,
        "engineers should be dropped after revert"
    );
    assert_eq!(table_count(&pool, "project_engineers").await, 0);

    TEST_MIGRATOR.run(&pool).await.expect("migrations rerun");
    assert_eq!(table_count(&pool, "engineers").await, 1);

    test_db.close().await.expect("failed to drop test database");
}
