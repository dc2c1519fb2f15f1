use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppState>) -> Router {
    // Managing availability requires an authenticated doctor; browsing
    // doctors and their open slots does not.
    let protected_routes = Router::new()
        .route(
            "/availability",
            put(handlers::set_availability).get(handlers::get_my_availability),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let public_routes = Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/{doctor_user_id}", get(handlers::get_doctor))
        .route("/{doctor_user_id}/slots", get(handlers::get_available_slots));

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .with_state(state)
}
