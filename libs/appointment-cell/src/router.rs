use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Every appointment route requires an authenticated user; handlers narrow
/// further by role.
pub fn appointment_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/my", get(handlers::my_appointments))
        .route("/doctor", get(handlers::doctor_appointments))
        .route("/{appointment_id}/approve", put(handlers::approve_appointment))
        .route("/{appointment_id}/reject", put(handlers::reject_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
