use rocket_db_pools::{Database, sqlx};

#[derive(Database)]
#[database("academia_db")]
pub struct AcademiaDb(sqlx::PgPool);

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Apply pending migrations. Called from an ignite fairing at startup and by
/// the test database factory.
pub async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
