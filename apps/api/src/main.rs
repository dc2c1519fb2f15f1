mod router;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use payment_cell::ExpirySweeper;
use shared_config::AppConfig;
use shared_database::{connect_pool, AppState};

const SWEEP_PERIOD: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    if !config.is_payments_configured() {
        warn!("Payment provider keys missing; approvals will fail until configured");
    }
    if !config.is_email_configured() {
        warn!("Email API not configured; notifications will be skipped");
    }

    let db = connect_pool(&config).await?;
    sqlx::migrate!("../../migrations").run(&db).await?;

    let port = config.port;
    let state = Arc::new(AppState { config, db });

    // Webhooks are the primary payment signal; the sweeper is the fallback
    // for deliveries that never arrive.
    Arc::new(ExpirySweeper::new(state.db.clone())).spawn(SWEEP_PERIOD);

    let app = router::app_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
