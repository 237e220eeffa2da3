use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

pub mod invoice_queries;
pub mod queries;

/// Connection pool for the intervention store. Traffic is a handful of
/// dashboard sessions plus anonymous link hits, each a single short query,
/// so the pool stays small and sheds idle connections quickly.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .connect(database_url)
        .await
}

/// Apply pending migrations at startup.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}
