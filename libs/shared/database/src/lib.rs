pub mod storage;

pub use storage::BlobStorage;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use shared_config::AppConfig;

/// Shared state handed to every cell router.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: PgPool,
}

pub async fn connect_pool(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    info!("Connected to Postgres");
    Ok(pool)
}

/// True when the error is a Postgres unique-constraint violation (SQLSTATE
/// 23505). The uniqueness constraints on appointments, payments and schedules
/// are the authoritative conflict signal; callers map this to their domain
/// conflict error instead of surfacing a raw database fault.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
