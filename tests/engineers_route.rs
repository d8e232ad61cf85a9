use hackdin::auth::SessionService;
use hackdin::models::{DataResponse, Engineer, ProjectListing};
use hackdin::routes::engineers::{
    create_engineer, get_engineer, get_engineer_projects, list_engineers, profile,
};
use hackdin::store;
use hackdin::test_support::{TestDatabase, TestFixtures, TestRocketBuilder, test_auth_config};
use rocket::http::{ContentType, Cookie, Status};
use rocket::local::asynchronous::Client;
use rocket::routes;
use serde_json::json;

async fn provision() -> TestDatabase {
    TestDatabase::new_from_env()
        .await
        .expect("failed to provision test database")
}

async fn client(pool: sqlx::PgPool) -> Client {
    TestRocketBuilder::new()
        .manage_pg_pool(pool)
        .manage_auth_state()
        .mount_routes(
            "/",
            routes![
                list_engineers,
                create_engineer,
                get_engineer,
                get_engineer_projects,
                profile
            ],
        )
        .async_client()
        .await
}

#[tokio::test]
async fn engineers_are_fetched_or_created_by_handle() {
    let test_db = provision().await;
    let client = client(test_db.pool_clone()).await;

    let first = client
        .post("/engineers/data")
        .header(ContentType::JSON)
        .body(json!({ "name": "Ada Lovelace", "gitHandle": "ada", "email": "ada@example.com" }).to_string())
        .dispatch()
        .await;
    assert_eq!(first.status(), Status::Created);
    let created: Engineer = first.into_json().await.expect("engineer");
    assert_eq!(created.git_handle, "ada");

    let second = client
        .post("/engineers/data")
        .header(ContentType::JSON)
        .body(json!({ "name": "Someone Else", "gitHandle": "ADA" }).to_string())
        .dispatch()
        .await;
    assert_eq!(second.status(), Status::Ok);
    let existing: Engineer = second.into_json().await.expect("engineer");
    assert_eq!(existing.id, created.id);
    assert_eq!(existing.name, "Ada Lovelace");

    let blank = client
        .post("/engineers/data")
        .header(ContentType::JSON)
        .body(json!({ "name": " ", "gitHandle": "grace" }).to_string())
        .dispatch()
        .await;
    assert_eq!(blank.status(), Status::BadRequest);

    let listed = client.get("/engineers/data").dispatch().await;
    assert_eq!(listed.status(), Status::Ok);
    let engineers: Vec<Engineer> = listed.into_json().await.expect("engineers");
    assert_eq!(engineers.len(), 1);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn engineer_lookup_by_handle() {
    let test_db = provision().await;
    TestFixtures::new(test_db.pool())
        .insert_engineer("Grace Hopper", "grace")
        .await
        .expect("insert engineer");
    let client = client(test_db.pool_clone()).await;

    let found = client.get("/engineer?gitHandle=Grace").dispatch().await;
    assert_eq!(found.status(), Status::Ok);
    let engineer: Engineer = found.into_json().await.expect("engineer");
    assert_eq!(engineer.name, "Grace Hopper");

    let missing = client.get("/engineer?gitHandle=nobody").dispatch().await;
    assert_eq!(missing.status(), Status::NotFound);

    let no_param = client.get("/engineer").dispatch().await;
    assert_eq!(no_param.status(), Status::BadRequest);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn profile_requires_a_session() {
    let test_db = provision().await;
    TestFixtures::new(test_db.pool())
        .insert_engineer("Linus", "linus")
        .await
        .expect("insert engineer");
    let engineer = store::find_engineer_by_handle(test_db.pool(), "linus")
        .await
        .expect("lookup")
        .expect("engineer exists");

    let config = test_auth_config();
    let token = SessionService::from_config(&config)
        .issue(&engineer)
        .expect("session issued");

    let client = client(test_db.pool_clone()).await;

    let signed_out = client.get("/profile").dispatch().await;
    assert_eq!(signed_out.status(), Status::SeeOther);
    assert_eq!(signed_out.headers().get_one("Location"), Some("/"));

    let tampered = client
        .get("/profile")
        .cookie(Cookie::new(config.session_cookie_name.clone(), "not-a-token"))
        .dispatch()
        .await;
    assert_eq!(tampered.status(), Status::SeeOther);

    let signed_in = client
        .get("/profile")
        .cookie(Cookie::new(config.session_cookie_name.clone(), token.clone()))
        .dispatch()
        .await;
    assert_eq!(signed_in.status(), Status::Ok);
    let own: Engineer = signed_in.into_json().await.expect("engineer");
    assert_eq!(own.id, engineer.id);

    sqlx::query("DELETE FROM engineers WHERE id = $1")
        .bind(engineer.id)
        .execute(test_db.pool())
        .await
        .expect("delete engineer");

    let orphaned = client
        .get("/profile")
        .cookie(Cookie::new(config.session_cookie_name.clone(), token))
        .dispatch()
        .await;
    assert_eq!(orphaned.status(), Status::NotFound);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn engineer_projects_come_from_the_join() {
    let test_db = provision().await;
    let fixtures = TestFixtures::new(test_db.pool());
    let ada = fixtures.insert_engineer("Ada Lovelace", "ada").await.expect("ada");
    let grace = fixtures.insert_engineer("Grace Hopper", "grace").await.expect("grace");
    let engine = fixtures.insert_project("Analytical Engine", None).await.expect("project");
    let cobol = fixtures.insert_project("COBOL", None).await.expect("project");
    fixtures.link(engine, ada).await.expect("link");
    fixtures.link(engine, grace).await.expect("link");
    fixtures.link(cobol, grace).await.expect("link");

    let client = client(test_db.pool_clone()).await;

    let response = client.get("/engineers/ada/projects").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let payload: DataResponse<Vec<ProjectListing>> = response.into_json().await.expect("payload");
    assert_eq!(payload.data.len(), 1);
    assert_eq!(payload.data[0].title, "Analytical Engine");
    assert_eq!(payload.data[0].engineers.len(), 2);

    let unknown = client.get("/engineers/nobody/projects").dispatch().await;
    assert_eq!(unknown.status(), Status::NotFound);

    test_db.close().await.expect("failed to drop test database");
}
