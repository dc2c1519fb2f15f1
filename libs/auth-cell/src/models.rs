use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::auth::Role;
use shared_models::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    /// Doctor-only; defaults when absent.
    pub specialization: Option<String>,
    pub city: Option<String>,
    /// Patient-only.
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Partial profile update; absent fields are left unchanged. Doctor-only
/// fields are rejected for patients and vice versa.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub city: Option<String>,
    pub fees: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: Uuid,
    pub role: Role,
    pub profile_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub profile: serde_json::Value,
}

/// Credential failures share one message so responses never reveal whether
/// an email is registered.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired session")]
    InvalidOrExpiredSession,

    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Password hashing failed")]
    Hashing,

    #[error("Token signing failed: {0}")]
    TokenSigning(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidCredentials => {
                AppError::Auth("Invalid email or password".to_string())
            }
            SessionError::InvalidOrExpiredSession => {
                AppError::Auth("Invalid or expired session".to_string())
            }
            SessionError::InvalidOrExpiredToken => {
                AppError::BadRequest("Invalid or expired reset token".to_string())
            }
            SessionError::EmailTaken => {
                AppError::Conflict("Email is already registered".to_string())
            }
            SessionError::Validation(msg) => AppError::ValidationError(msg),
            SessionError::Hashing => AppError::Internal("Password hashing failed".to_string()),
            SessionError::TokenSigning(msg) => AppError::Internal(msg),
            SessionError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
