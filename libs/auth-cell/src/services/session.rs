use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::is_unique_violation;
use shared_models::auth::{AuthUser, Role};
use shared_utils::jwt::sign_access_token;

use crate::models::{
    AuthResponse, MeResponse, RegisterRequest, SessionError, UpdateProfileRequest,
};

/// Refresh tokens outlive access tokens by design; revoking them is how a
/// session actually ends.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

const MIN_PASSWORD_LENGTH: usize = 8;

pub struct SessionService {
    db: PgPool,
    jwt_secret: String,
}

impl SessionService {
    pub fn new(db: PgPool, jwt_secret: String) -> Self {
        Self { db, jwt_secret }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, SessionError> {
        if !request.email.contains('@') {
            return Err(SessionError::Validation("Invalid email address".to_string()));
        }
        if request.password.len() < MIN_PASSWORD_LENGTH {
            return Err(SessionError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if request.name.trim().is_empty() {
            return Err(SessionError::Validation("Name is required".to_string()));
        }

        let taken: Option<i32> = sqlx::query_scalar("SELECT 1 FROM users WHERE email = $1")
            .bind(&request.email)
            .fetch_optional(&self.db)
            .await?;
        if taken.is_some() {
            return Err(SessionError::EmailTaken);
        }

        let password_hash = hash_password(&request.password)?;

        let mut tx = self.db.begin().await?;

        // The email pre-check above can lose a race; the unique constraint on
        // users.email is the authoritative answer.
        let inserted: Result<Uuid, sqlx::Error> = sqlx::query_scalar(
            "INSERT INTO users (email, password_hash, role) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&request.email)
        .bind(&password_hash)
        .bind(request.role)
        .fetch_one(&mut *tx)
        .await;

        let user_id = match inserted {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => return Err(SessionError::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        let profile_id: Uuid = match request.role {
            Role::Doctor => {
                let registration_number = format!("REG-{}", Utc::now().timestamp());
                sqlx::query_scalar(
                    "INSERT INTO doctor_profiles \
                         (user_id, name, specialization, registration_number, fees, city) \
                     VALUES ($1, $2, $3, $4, $5, $6) \
                     RETURNING id",
                )
                .bind(user_id)
                .bind(request.name.trim())
                .bind(
                    request
                        .specialization
                        .as_deref()
                        .unwrap_or("General Physician"),
                )
                .bind(&registration_number)
                .bind(5000i64)
                .bind(&request.city)
                .fetch_one(&mut *tx)
                .await?
            }
            Role::Patient => {
                sqlx::query_scalar(
                    "INSERT INTO patient_profiles (user_id, name, phone) \
                     VALUES ($1, $2, $3) RETURNING id",
                )
                .bind(user_id)
                .bind(request.name.trim())
                .bind(request.phone.as_deref().unwrap_or(""))
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        info!("Registered new {} account {}", request.role, user_id);

        self.open_session(user_id, request.role, Some(profile_id), 0)
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, SessionError> {
        let user: Option<(Uuid, String, Role, i32)> = sqlx::query_as(
            "SELECT id, password_hash, role, token_version FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        // Missing account and wrong password take the same path.
        let Some((user_id, password_hash, role, token_version)) = user else {
            return Err(SessionError::InvalidCredentials);
        };

        let parsed =
            PasswordHash::new(&password_hash).map_err(|_| SessionError::InvalidCredentials)?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Err(SessionError::InvalidCredentials);
        }

        let profile_id = self.profile_id_for(user_id, role).await?;

        self.open_session(user_id, role, profile_id, token_version)
            .await
    }

    /// Exchanges a live refresh token for a fresh access token. The refresh
    /// token itself is not rotated; logout or a password reset kills it.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, SessionError> {
        let row: Option<(Uuid, bool, chrono::DateTime<Utc>)> = sqlx::query_as(
            "SELECT user_id, revoked, expires_at FROM refresh_tokens WHERE token = $1",
        )
        .bind(refresh_token)
        .fetch_optional(&self.db)
        .await?;

        let Some((user_id, revoked, expires_at)) = row else {
            return Err(SessionError::InvalidOrExpiredSession);
        };
        if revoked || expires_at < Utc::now() {
            return Err(SessionError::InvalidOrExpiredSession);
        }

        let user: Option<(Role, i32)> =
            sqlx::query_as("SELECT role, token_version FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;
        let Some((role, token_version)) = user else {
            return Err(SessionError::InvalidOrExpiredSession);
        };

        let profile_id = self.profile_id_for(user_id, role).await?;

        sign_access_token(user_id, role, profile_id, token_version, &self.jwt_secret)
            .map_err(SessionError::TokenSigning)
    }

    /// Revokes a refresh token. Unknown or already-revoked tokens succeed;
    /// logout is idempotent.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), SessionError> {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE token = $1")
            .bind(refresh_token)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    pub async fn me(&self, user: &AuthUser) -> Result<MeResponse, SessionError> {
        let email: String = sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
            .bind(user.user_id)
            .fetch_one(&self.db)
            .await?;

        let profile = match user.role {
            Role::Doctor => {
                let row: Option<(String, String, String, Option<i64>, Option<String>)> =
                    sqlx::query_as(
                        "SELECT name, specialization, registration_number, fees, city \
                         FROM doctor_profiles WHERE user_id = $1",
                    )
                    .bind(user.user_id)
                    .fetch_optional(&self.db)
                    .await?;
                row.map(|(name, specialization, registration_number, fees, city)| {
                    json!({
                        "name": name,
                        "specialization": specialization,
                        "registration_number": registration_number,
                        "fees": fees,
                        "city": city,
                    })
                })
            }
            Role::Patient => {
                let row: Option<(String, String)> =
                    sqlx::query_as("SELECT name, phone FROM patient_profiles WHERE user_id = $1")
                        .bind(user.user_id)
                        .fetch_optional(&self.db)
                        .await?;
                row.map(|(name, phone)| json!({ "name": name, "phone": phone }))
            }
        };

        Ok(MeResponse {
            user_id: user.user_id,
            email,
            role: user.role,
            profile: profile.unwrap_or(serde_json::Value::Null),
        })
    }

    /// Partial update of the caller's own profile; unset fields keep their
    /// stored value.
    pub async fn update_profile(
        &self,
        user: &AuthUser,
        request: UpdateProfileRequest,
    ) -> Result<MeResponse, SessionError> {
        if let Some(name) = &request.name {
            if name.trim().is_empty() {
                return Err(SessionError::Validation("Name cannot be blank".to_string()));
            }
        }

        let updated = match user.role {
            Role::Patient => {
                if request.specialization.is_some()
                    || request.city.is_some()
                    || request.fees.is_some()
                {
                    return Err(SessionError::Validation(
                        "Unknown fields for a patient profile".to_string(),
                    ));
                }
                if request.name.is_none() && request.phone.is_none() {
                    return Err(SessionError::Validation("No fields to update".to_string()));
                }
                sqlx::query(
                    "UPDATE patient_profiles \
                     SET name = COALESCE($2, name), phone = COALESCE($3, phone) \
                     WHERE user_id = $1",
                )
                .bind(user.user_id)
                .bind(request.name.as_deref().map(str::trim))
                .bind(&request.phone)
                .execute(&self.db)
                .await?
            }
            Role::Doctor => {
                if request.phone.is_some() {
                    return Err(SessionError::Validation(
                        "Unknown fields for a doctor profile".to_string(),
                    ));
                }
                if request.name.is_none()
                    && request.specialization.is_none()
                    && request.city.is_none()
                    && request.fees.is_none()
                {
                    return Err(SessionError::Validation("No fields to update".to_string()));
                }
                if matches!(request.fees, Some(fees) if fees <= 0) {
                    return Err(SessionError::Validation(
                        "Fees must be a positive amount".to_string(),
                    ));
                }
                sqlx::query(
                    "UPDATE doctor_profiles \
                     SET name = COALESCE($2, name), \
                         specialization = COALESCE($3, specialization), \
                         city = COALESCE($4, city), \
                         fees = COALESCE($5, fees) \
                     WHERE user_id = $1",
                )
                .bind(user.user_id)
                .bind(request.name.as_deref().map(str::trim))
                .bind(&request.specialization)
                .bind(&request.city)
                .bind(request.fees)
                .execute(&self.db)
                .await?
            }
        };

        if updated.rows_affected() == 0 {
            return Err(SessionError::Database(sqlx::Error::RowNotFound));
        }

        self.me(user).await
    }

    /// Issues the access/refresh pair for a fresh login, revoking every other
    /// live refresh token so one device holds the session at a time.
    async fn open_session(
        &self,
        user_id: Uuid,
        role: Role,
        profile_id: Option<Uuid>,
        token_version: i32,
    ) -> Result<AuthResponse, SessionError> {
        let access_token =
            sign_access_token(user_id, role, profile_id, token_version, &self.jwt_secret)
                .map_err(SessionError::TokenSigning)?;

        let refresh_token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::days(REFRESH_TOKEN_TTL_DAYS);

        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&refresh_token)
        .bind(user_id)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Opened session for user {}", user_id);

        Ok(AuthResponse {
            access_token,
            refresh_token,
            user_id,
            role,
            profile_id,
        })
    }

    async fn profile_id_for(
        &self,
        user_id: Uuid,
        role: Role,
    ) -> Result<Option<Uuid>, SessionError> {
        let table = match role {
            Role::Doctor => "doctor_profiles",
            Role::Patient => "patient_profiles",
        };
        let profile_id: Option<Uuid> =
            sqlx::query_scalar(&format!("SELECT id FROM {} WHERE user_id = $1", table))
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(profile_id)
    }
}

pub(crate) fn hash_password(password: &str) -> Result<String, SessionError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| SessionError::Hashing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_and_salts() {
        let first = hash_password("correct horse battery").unwrap();
        let second = hash_password("correct horse battery").unwrap();
        assert_ne!(first, second);

        let parsed = PasswordHash::new(&first).unwrap();
        assert!(Argon2::default()
            .verify_password(b"correct horse battery", &parsed)
            .is_ok());
        assert!(Argon2::default()
            .verify_password(b"wrong password", &parsed)
            .is_err());
    }
}
