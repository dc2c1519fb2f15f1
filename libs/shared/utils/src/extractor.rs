use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use shared_database::AppState;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::jwt::verify_access_token;

/// Authentication middleware: verifies the bearer token, then compares the
/// embedded token version with the user's current version so that a password
/// reset immediately invalidates tokens that have not yet expired.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    let token = &auth_value[7..];

    let claims = verify_access_token(token, &state.config.jwt_secret)
        .map_err(AppError::Auth)?;

    let current_version: Option<i32> =
        sqlx::query_scalar("SELECT token_version FROM users WHERE id = $1")
            .bind(claims.sub)
            .fetch_optional(&state.db)
            .await?;

    match current_version {
        Some(version) if version == claims.version => {}
        Some(_) => {
            debug!("Stale token version for user {}", claims.sub);
            return Err(AppError::Auth("Invalid or expired token".to_string()));
        }
        None => return Err(AppError::Auth("Invalid or expired token".to_string())),
    }

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        role: claims.role,
        profile_id: claims.profile_id,
    });

    Ok(next.run(request).await)
}
