use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use shared_utils::mailer::Mailer;

use crate::models::SessionError;
use crate::services::session::hash_password;

/// Reset links expire quickly; a lost email is re-requested, not extended.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Email-based password reset. Only a SHA-256 digest of the token is stored,
/// so a leaked table cannot be replayed into working reset links.
pub struct PasswordResetService {
    db: PgPool,
    mailer: Mailer,
    frontend_url: String,
}

impl PasswordResetService {
    pub fn new(db: PgPool, mailer: Mailer, frontend_url: String) -> Self {
        Self {
            db,
            mailer,
            frontend_url,
        }
    }

    /// Always resolves successfully so the endpoint never discloses whether
    /// an email is registered.
    pub async fn request_reset(&self, email: &str) -> Result<(), SessionError> {
        let user_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        let Some(user_id) = user_id else {
            info!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_token();
        let token_hash = hash_token(&token);
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

        let mut tx = self.db.begin().await?;

        // One live token per user.
        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO password_reset_tokens (token_hash, user_id, expires_at) \
             VALUES ($1, $2, $3)",
        )
        .bind(&token_hash)
        .bind(user_id)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let reset_link = format!("{}/reset-password?token={}", self.frontend_url, token);
        let body = format!(
            "<p>A password reset was requested for your account.</p>\
             <p><a href=\"{}\">Reset your password</a>. The link expires in {} minutes.</p>\
             <p>If you did not request this, you can ignore this email.</p>",
            reset_link, RESET_TOKEN_TTL_MINUTES
        );
        if let Err(e) = self.mailer.send(email, "Reset your password", &body).await {
            error!("Failed to send password reset email: {}", e);
        }

        Ok(())
    }

    /// Consumes a reset token: sets the new password, bumps the token version
    /// to void outstanding access tokens, and drops every refresh token.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), SessionError> {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(SessionError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let token_hash = hash_token(token);

        let row: Option<(Uuid, Uuid, bool, chrono::DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, user_id, used, expires_at FROM password_reset_tokens \
             WHERE token_hash = $1",
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await?;

        let Some((token_id, user_id, used, expires_at)) = row else {
            return Err(SessionError::InvalidOrExpiredToken);
        };
        if used || expires_at < Utc::now() {
            return Err(SessionError::InvalidOrExpiredToken);
        }

        let password_hash = hash_password(new_password)?;

        let mut tx = self.db.begin().await?;

        sqlx::query(
            "UPDATE users SET password_hash = $2, token_version = token_version + 1 \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(&password_hash)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE password_reset_tokens SET used = TRUE WHERE id = $1")
            .bind(token_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Password reset completed for user {}", user_id);
        Ok(())
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub(crate) fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_urlsafe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn token_hash_is_stable_sha256_hex() {
        let digest = hash_token("abc");
        assert_eq!(digest, hash_token("abc"));
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(digest, hash_token("abd"));
    }
}
