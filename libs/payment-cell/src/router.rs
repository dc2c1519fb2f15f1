use std::sync::Arc;

use axum::routing::post;
use axum::Router;

use shared_database::AppState;

use crate::handlers;

/// Webhook endpoint only. It stays outside the auth middleware because the
/// provider authenticates with the signature header instead of a bearer token.
pub fn payment_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(handlers::stripe_webhook))
        .with_state(state)
}
