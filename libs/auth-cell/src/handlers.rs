use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};
use tracing::debug;

use shared_database::AppState;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_utils::mailer::Mailer;

use crate::models::{
    AccessTokenResponse, AuthResponse, ForgotPasswordRequest, LoginRequest, LogoutRequest,
    MeResponse, RefreshRequest, RegisterRequest, ResetPasswordRequest, UpdateProfileRequest,
};
use crate::services::password_reset::PasswordResetService;
use crate::services::session::SessionService;

fn session_service(state: &AppState) -> SessionService {
    SessionService::new(state.db.clone(), state.config.jwt_secret.clone())
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    debug!("Registering new {} account", request.role);
    let response = session_service(&state).register(request).await?;
    Ok(Json(response))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = session_service(&state)
        .login(&request.email, &request.password)
        .await?;
    Ok(Json(response))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let access_token = session_service(&state)
        .refresh(&request.refresh_token)
        .await?;
    Ok(Json(AccessTokenResponse { access_token }))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LogoutRequest>,
) -> Result<Json<Value>, AppError> {
    session_service(&state)
        .logout(&request.refresh_token)
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PasswordResetService::new(
        state.db.clone(),
        Mailer::new(&state.config),
        state.config.frontend_url.clone(),
    );
    service.request_reset(&request.email).await?;

    // Same body whether or not the email exists.
    Ok(Json(json!({
        "message": "If that email is registered, a reset link has been sent"
    })))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PasswordResetService::new(
        state.db.clone(),
        Mailer::new(&state.config),
        state.config.frontend_url.clone(),
    );
    service
        .reset_password(&request.token, &request.new_password)
        .await?;

    Ok(Json(json!({ "message": "Password has been reset" })))
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MeResponse>, AppError> {
    let response = session_service(&state).me(&user).await?;
    Ok(Json(response))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<MeResponse>, AppError> {
    debug!("User {} updating profile", user.user_id);
    let response = session_service(&state)
        .update_profile(&user, request)
        .await?;
    Ok(Json(response))
}
