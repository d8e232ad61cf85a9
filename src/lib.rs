#[macro_use]
extern crate rocket;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;
pub mod store;
pub mod uploads;

use crate::auth::{AuthConfig, AuthState};
use crate::config::ClientConfig;
use crate::db::HackdinDb;
use crate::request_logger::RequestLogger;
use crate::uploads::{CloudinaryConfig, ImageService};
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::fs::{FileServer, Options};
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_db_pools::sqlx::{self, PgPool};
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::Once;

static LOGGER: Once = Once::new();

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

/// Apply pending schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    let client_config = ClientConfig::from_env();
    log::info!("serving client pages from {}", client_config.client_dir.display());

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(HackdinDb::init())
        .attach(cors)
        .attach(AdHoc::try_on_ignite("Run Migrations", |rocket| async move {
            match HackdinDb::fetch(&rocket) {
                Some(db) => {
                    let pool = (**db).clone();
                    match run_migrations(&pool).await {
                        Ok(_) => {
                            log::info!("database migrations successful");
                            Ok(rocket)
                        }
                        Err(e) => {
                            log::error!("database migrations failed: {}", e);
                            Err(rocket)
                        }
                    }
                }
                None => {
                    log::error!("database pool not available for migrations");
                    Err(rocket)
                }
            }
        }))
        // Handlers take `&State<PgPool>` so they can run against any pool.
        .attach(AdHoc::try_on_ignite("Manage DB Pool", |rocket| async move {
            match HackdinDb::fetch(&rocket) {
                Some(db) => {
                    let pool = (**db).clone();
                    Ok(rocket.manage(pool))
                }
                None => Err(rocket),
            }
        }))
        .attach(AdHoc::try_on_ignite(
            "Auth Configuration",
            |rocket| async move {
                match AuthConfig::from_env().and_then(AuthState::new) {
                    Ok(state) => {
                        log::info!(
                            "github sign-in enabled (callback {})",
                            state.config.github_callback_url
                        );
                        Ok(rocket.manage(state))
                    }
                    Err(err) => {
                        log::error!("auth configuration invalid: {}", err);
                        Err(rocket)
                    }
                }
            },
        ))
        .attach(AdHoc::try_on_ignite("Image Hosting", |rocket| async move {
            let service = CloudinaryConfig::from_env().and_then(ImageService::from_config);
            match service {
                Ok(service) => {
                    if service.is_enabled() {
                        log::info!("project images will be uploaded to Cloudinary");
                    } else {
                        log::warn!(
                            "Cloudinary not configured; project image URLs are stored as submitted"
                        );
                    }
                    Ok(rocket.manage(service))
                }
                Err(err) => {
                    log::error!("image hosting configuration invalid: {}", err);
                    Err(rocket)
                }
            }
        }))
        .manage(client_config.clone())
        .mount(
            "/",
            openapi_get_routes![
                // Health routes
                routes::health::health_check,
                // Project routes
                routes::projects::list_projects,
                routes::projects::get_project,
                routes::projects::create_project,
                // Engineer routes
                routes::engineers::list_engineers,
                routes::engineers::create_engineer,
                routes::engineers::get_engineer,
                routes::engineers::get_engineer_projects,
            ],
        )
        .mount(
            "/",
            routes![
                // Pages
                routes::pages::index,
                routes::pages::new_project,
                routes::pages::new_engineer,
                // Session routes
                routes::engineers::profile,
                auth::routes::signin,
                auth::routes::signup,
                auth::routes::github_callback,
                auth::routes::signout,
            ],
        )
        .mount(
            "/",
            FileServer::new(&client_config.client_dir, Options::Missing).rank(20),
        )
        .mount(
            "/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Hackdin API", "../../openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use std::sync::{Arc, Mutex};

    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use rocket_db_pools::sqlx::{self, PgPool};

    use crate::auth::{AuthConfig, AuthState};
    use crate::config::ClientConfig;
    use crate::uploads::{ImageHost, ImageService, UploadError, UploadedImage};

    pub use database::{TestDatabase, TestDatabaseError};

    /// Auth settings for tests; nothing here talks to GitHub.
    pub fn test_auth_config() -> AuthConfig {
        AuthConfig {
            github_client_id: "test-client".into(),
            github_client_secret: "test-secret".into(),
            github_callback_url: "http://localhost:3000/auth/github/callback".into(),
            github_authorize_url: "https://github.com/login/oauth/authorize".into(),
            github_token_url: "https://github.com/login/oauth/access_token".into(),
            github_api_base: "https://api.github.com".into(),
            session_secret: "test-session-secret-that-is-long-enough!".into(),
            session_issuer: "hackdin".into(),
            session_audience: "hackdin-test".into(),
            session_ttl_secs: 3600,
            session_cookie_name: "hackdin_session".into(),
            state_cookie_name: "hackdin_oauth_state".into(),
            state_ttl_secs: 600,
            cookie_domain: None,
            cookie_secure: false,
        }
    }

    /// In-memory image host that records every upload.
    #[derive(Default)]
    pub struct RecordingImageHost {
        uploads: Mutex<Vec<String>>,
    }

    impl RecordingImageHost {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Source URLs uploaded so far, in call order.
        pub fn uploads(&self) -> Vec<String> {
            self.uploads
                .lock()
                .map(|uploads| uploads.clone())
                .unwrap_or_default()
        }

        /// An `ImageService` backed by this host.
        pub fn service(host: &Arc<Self>) -> ImageService {
            ImageService::new(
                Some(host.clone() as Arc<dyn ImageHost>),
                crate::uploads::config::DEFAULT_TRANSFORMATION,
            )
        }
    }

    #[rocket::async_trait]
    impl ImageHost for RecordingImageHost {
        async fn upload(&self, source_url: &str) -> Result<UploadedImage, UploadError> {
            let count = {
                let mut uploads = self
                    .uploads
                    .lock()
                    .map_err(|_| UploadError::Config("upload log poisoned".into()))?;
                uploads.push(source_url.to_string());
                uploads.len()
            };

            let public_id = format!("hackdin/test-{count}");
            Ok(UploadedImage {
                secure_url: format!(
                    "https://res.cloudinary.com/test/image/upload/v1700000000/{public_id}.jpg"
                ),
                public_id,
            })
        }
    }

    /// Convenience helpers for seeding showcase tables in tests.
    pub struct TestFixtures<'a> {
        pool: &'a PgPool,
    }

    impl<'a> TestFixtures<'a> {
        /// Create a fixture helper bound to the provided pool.
        pub fn new(pool: &'a PgPool) -> Self {
            Self { pool }
        }

        /// Insert an engineer, returning the new id.
        pub async fn insert_engineer(&self, name: &str, git_handle: &str) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar(
                "INSERT INTO engineers (name, git_handle, email) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(name)
            .bind(git_handle)
            .bind(format!("{git_handle}@example.com"))
            .fetch_one(self.pool)
            .await
        }

        /// Insert a project, creating its school when one is given.
        pub async fn insert_project(
            &self,
            title: &str,
            school: Option<&str>,
        ) -> Result<i32, sqlx::Error> {
            let school_id: Option<i32> = match school {
                Some(name) => Some(
                    sqlx::query_scalar(
                        "INSERT INTO schools (name) VALUES ($1) ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING id",
                    )
                    .bind(name)
                    .fetch_one(self.pool)
                    .await?,
                ),
                None => None,
            };

            sqlx::query_scalar(
                "INSERT INTO projects (title, description, school_id) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(title)
            .bind(format!("{title} description"))
            .bind(school_id)
            .fetch_one(self.pool)
            .await
        }

        /// Link an engineer to a project.
        pub async fn link(&self, project_id: i32, engineer_id: i32) -> Result<(), sqlx::Error> {
            sqlx::query("INSERT INTO project_engineers (project_id, engineer_id) VALUES ($1, $2)")
                .bind(project_id)
                .bind(engineer_id)
                .execute(self.pool)
                .await?;
            Ok(())
        }
    }

    pub mod database {
        use log::LevelFilter;
        use rocket_db_pools::sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use rocket_db_pools::sqlx::{self, ConnectOptions, PgPool};
        use testcontainers::ImageExt;
        use testcontainers_modules::postgres::Postgres;
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use tokio::runtime::Handle;
        use uuid::Uuid;

        use crate::config::env_opt;

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database factory for integration tests.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            admin_options: PgConnectOptions,
            database_name: String,
            container: Option<ContainerAsync<Postgres>>,
        }

        impl TestDatabase {
            /// Provision a fresh, migrated database in a disposable Postgres
            /// container, or next to `TEST_DATABASE_URL` when that is set.
            pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
                if let Some(url) = env_opt("TEST_DATABASE_URL") {
                    return Self::new(&url, None).await;
                }

                let container = Postgres::default().with_tag("16-alpine").start().await?;
                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                Self::new(&url, Some(container)).await
            }

            /// Create a uniquely named database next to the one `base_url` points at.
            pub async fn new(
                base_url: &str,
                container: Option<ContainerAsync<Postgres>>,
            ) -> Result<Self, TestDatabaseError> {
                let base_options: PgConnectOptions =
                    base_url.parse().map_err(TestDatabaseError::Sqlx)?;
                let base_options = base_options.log_statements(LevelFilter::Off);

                let base_name = base_options
                    .get_database()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "postgres".to_string());

                let admin_options = base_options.clone().database("postgres");
                let admin_pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(admin_options.clone())
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                let new_db_name = format!("{}_{}", base_name, Uuid::new_v4().simple());
                let create_sql = format!("CREATE DATABASE \"{}\" TEMPLATE template0", new_db_name);
                sqlx::query(&create_sql)
                    .execute(&admin_pool)
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;
                admin_pool.close().await;

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect_with(base_options.clone().database(&new_db_name))
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                crate::run_migrations(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    admin_options,
                    database_name: new_db_name,
                    container,
                })
            }

            /// Connection pool bound to the ephemeral database.
            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Close pool connections and drop the ephemeral database.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }

                drop_database_with_fallback(self.admin_options.clone(), &self.database_name)
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                if let Some(container) = self.container.take() {
                    drop(container);
                }

                Ok(())
            }
        }

        async fn drop_database_with_fallback(
            admin_options: PgConnectOptions,
            database_name: &str,
        ) -> Result<(), sqlx::Error> {
            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(admin_options)
                .await?;

            let drop_force = format!("DROP DATABASE \"{}\" WITH (FORCE)", database_name);
            match sqlx::query(&drop_force).execute(&admin_pool).await {
                Ok(_) => Ok(()),
                Err(err) if force_drop_unsupported(&err) => {
                    let drop_sql = format!("DROP DATABASE \"{}\"", database_name);
                    sqlx::query(&drop_sql).execute(&admin_pool).await?;
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }

        fn force_drop_unsupported(err: &sqlx::Error) -> bool {
            matches!(
                err,
                sqlx::Error::Database(db_err)
                    if db_err
                        .code()
                        .map(|code| code == "42601" || code == "0A000")
                        .unwrap_or(false)
            )
        }

        impl Drop for TestDatabase {
            fn drop(&mut self) {
                if let Some(pool) = self.pool.take() {
                    let admin_options = self.admin_options.clone();
                    let db_name = self.database_name.clone();
                    if let Ok(handle) = Handle::try_current() {
                        handle.spawn(async move {
                            pool.close().await;
                            let _ = drop_database_with_fallback(admin_options, &db_name).await;
                        });
                    } else {
                        std::thread::spawn(move || {
                            if let Ok(rt) = tokio::runtime::Runtime::new() {
                                rt.block_on(async move {
                                    pool.close().await;
                                    let _ =
                                        drop_database_with_fallback(admin_options, &db_name).await;
                                });
                            }
                        });
                    }
                }

                if let Some(container) = self.container.take() {
                    drop(container);
                }
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        pg_pool: Option<PgPool>,
        auth_state: Option<AuthState>,
        image_service: Option<ImageService>,
        client_config: Option<ClientConfig>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                ..Default::default()
            }
        }

        /// Mount routes under `base`.
        pub fn mount_routes(mut self, base: &str, routes: Vec<Route>) -> Self {
            self.mounts.push((base.to_string(), routes));
            self
        }

        /// Manage a `PgPool` instance for tests that exercise database-backed routes.
        pub fn manage_pg_pool(mut self, pool: PgPool) -> Self {
            self.pg_pool = Some(pool);
            self
        }

        /// Manage an `AuthState` built from [`test_auth_config`].
        pub fn manage_auth_state(mut self) -> Self {
            self.auth_state =
                Some(AuthState::new(test_auth_config()).expect("test auth state builds"));
            self
        }

        pub fn manage_image_service(mut self, service: ImageService) -> Self {
            self.image_service = Some(service);
            self
        }

        pub fn manage_client_config(mut self, config: ClientConfig) -> Self {
            self.client_config = Some(config);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(pool) = self.pg_pool {
                rocket = rocket.manage(pool);
            }
            if let Some(state) = self.auth_state {
                rocket = rocket.manage(state);
            }
            if let Some(service) = self.image_service {
                rocket = rocket.manage(service);
            }
            if let Some(config) = self.client_config {
                rocket = rocket.manage(config);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
