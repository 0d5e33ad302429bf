pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;

use crate::auth::AuthState;
use crate::db::AcademiaDb;
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::Once;

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

/// All API routes: the OpenAPI-documented resource routes plus the form-based
/// token endpoint. Shared between the production build and test harnesses.
pub fn api_routes() -> Vec<rocket::Route> {
    let mut api = openapi_get_routes![
        // Health
        routes::health::health_check,
        // Usuarios
        routes::usuarios::create_user,
        routes::usuarios::read_users_me,
        routes::usuarios::read_user,
        routes::usuarios::update_user,
        routes::usuarios::delete_user,
        routes::usuarios::list_users,
        // Materias
        routes::materias::create_score,
        routes::materias::list_scores,
        routes::materias::read_score,
        routes::materias::update_score,
        routes::materias::delete_score,
        routes::materias::enroll_student,
        routes::materias::list_enrolled_students,
        routes::materias::unenroll_student,
        // Calificaciones
        routes::calificaciones::create_calificacion,
        routes::calificaciones::read_calificacion,
        routes::calificaciones::update_calificacion,
        routes::calificaciones::delete_calificacion,
        routes::calificaciones::list_by_student,
        routes::calificaciones::list_by_score,
    ];
    api.extend(rocket::routes![auth::routes::login_for_access_token]);
    api
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![
                Method::Get,
                Method::Post,
                Method::Put,
                Method::Delete,
                Method::Patch,
            ]
            .into_iter()
            .map(From::from)
            .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    let auth_state =
        AuthState::from_env().expect("auth configuration (ACADEMIA_JWT_SECRET is required)");

    rocket::build()
        .attach(RequestLogger)
        .attach(AcademiaDb::init())
        .attach(cors)
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite("Run Migrations", |rocket| async move {
            match AcademiaDb::fetch(&rocket) {
                Some(database) => {
                    let pool = (**database).clone();
                    match db::run_migrations(&pool).await {
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
        // Clone the pool into managed state for guards and transaction-scoped work
        .attach(AdHoc::try_on_ignite("Manage DB Pool", |rocket| async move {
            match AcademiaDb::fetch(&rocket) {
                Some(database) => {
                    let pool = (**database).clone();
                    Ok(rocket.manage(pool))
                }
                None => Err(rocket),
            }
        }))
        .manage(auth_state)
        .mount("/", api_routes())
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
                    spec_urls: vec![UrlObject::new("Academia API", "../../openapi.json")],
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
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use rocket_db_pools::sqlx::{self, PgPool};

    use crate::auth::{AuthConfig, AuthState, JwtService, PasswordService};
    use crate::models::{CalificacionTipo, Gender, Role};

    pub use database::{TestDatabase, TestDatabaseError};

    pub const TEST_JWT_SECRET: &str = "academia-test-secret";

    /// Auth state with a fixed secret and default TTL, independent of the
    /// environment.
    pub fn test_auth_state() -> AuthState {
        let config = AuthConfig {
            issuer: "https://academia.test".into(),
            audience: "academia-api".into(),
            access_token_ttl_secs: 1800,
            jwt_secret: TEST_JWT_SECRET.into(),
        };
        let password_service = PasswordService::new().expect("password service");
        let jwt_service = JwtService::from_config(&config).expect("jwt service");
        AuthState::new(config, password_service, jwt_service)
    }

    /// Convenience helpers for seeding users, subjects, and grades in tests.
    pub struct TestFixtures<'a> {
        pool: &'a PgPool,
    }

    impl<'a> TestFixtures<'a> {
        /// Create a fixture helper bound to the provided pool.
        pub fn new(pool: &'a PgPool) -> Self {
            Self { pool }
        }

        /// Insert a user row, returning the new user id. The full name is
        /// derived from the login name; gender is arbitrary.
        pub async fn insert_user(
            &self,
            name_user: &str,
            cedula: &str,
            email: &str,
            role: Role,
            hashed_password: &str,
            specialization: Option<&str>,
        ) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar(
                "INSERT INTO users \
                 (name_complete, name_user, cedula, email, gender, role, hashed_password, specialization) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING user_id",
            )
            .bind(format!("Test {name_user}"))
            .bind(name_user)
            .bind(cedula)
            .bind(email)
            .bind(Gender::Female)
            .bind(role)
            .bind(hashed_password)
            .bind(specialization)
            .fetch_one(self.pool)
            .await
        }

        /// Insert a subject owned by the given professor.
        pub async fn insert_score(
            &self,
            materia: &str,
            professor_id: i32,
        ) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar(
                "INSERT INTO scores (materia, professor_id) VALUES ($1, $2) RETURNING score_id",
            )
            .bind(materia)
            .bind(professor_id)
            .fetch_one(self.pool)
            .await
        }

        /// Enroll a student in a subject.
        pub async fn enroll(&self, student_id: i32, score_id: i32) -> Result<(), sqlx::Error> {
            sqlx::query("INSERT INTO student_score_link (student_id, score_id) VALUES ($1, $2)")
                .bind(student_id)
                .bind(score_id)
                .execute(self.pool)
                .await?;
            Ok(())
        }

        /// Insert a grade dated today, returning its id.
        pub async fn insert_calificacion(
            &self,
            valor: f64,
            tipo: CalificacionTipo,
            student_id: i32,
            score_id: i32,
            professor_id: i32,
        ) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar(
                "INSERT INTO calificaciones (valor, tipo, student_id, score_id, professor_id) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING calificacion_id",
            )
            .bind(valor)
            .bind(tipo)
            .bind(student_id)
            .bind(score_id)
            .bind(professor_id)
            .fetch_one(self.pool)
            .await
        }
    }

    pub mod database {
        use rocket_db_pools::sqlx::postgres::PgPoolOptions;
        use rocket_db_pools::sqlx::{self, PgPool};
        use testcontainers_modules::postgres::Postgres;
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database factory for integration tests. Each instance
        /// launches a disposable Postgres container and applies migrations.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            container: Option<ContainerAsync<Postgres>>,
        }

        impl TestDatabase {
            pub async fn new() -> Result<Self, TestDatabaseError> {
                let container = Postgres::default().start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(&url)
                    .await?;

                crate::db::MIGRATOR.run(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    container: Some(container),
                })
            }

            /// Cloneable connection pool for use in tests and Rocket state.
            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            /// Convenience method returning a clone of the pooled handle.
            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Close pool connections and stop the container.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }
                if let Some(container) = self.container.take() {
                    drop(container);
                }
                Ok(())
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration
    /// tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        pg_pool: Option<PgPool>,
        auth_state: Option<AuthState>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging off.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                pg_pool: None,
                auth_state: None,
            }
        }

        /// Mount routes at the API root.
        pub fn mount_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/".to_string(), routes));
            self
        }

        /// Manage a `PgPool` for routes and guards that hit the database.
        pub fn manage_pg_pool(mut self, pool: PgPool) -> Self {
            self.pg_pool = Some(pool);
            self
        }

        /// Manage an `AuthState` for token issuance and the auth guards.
        pub fn manage_auth_state(mut self, state: AuthState) -> Self {
            self.auth_state = Some(state);
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
