use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use shared_database::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth_cell::router::auth_routes(state.clone()))
        .nest("/doctors", doctor_cell::router::doctor_routes(state.clone()))
        .nest(
            "/appointments",
            appointment_cell::router::appointment_routes(state.clone()),
        )
        .nest("/payments", payment_cell::router::payment_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
