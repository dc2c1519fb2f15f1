use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{JwtClaims, Role};

/// Access tokens are short-lived; session longevity comes from the persisted
/// refresh token, not from the JWT itself.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

pub fn sign_access_token(
    user_id: Uuid,
    role: Role,
    profile_id: Option<Uuid>,
    token_version: i32,
    jwt_secret: &str,
) -> Result<String, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id,
        role,
        profile_id,
        version: token_version,
        iat: now.timestamp(),
        exp: (now + Duration::minutes(ACCESS_TOKEN_TTL_MINUTES)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        debug!("Failed to sign access token: {}", e);
        "Failed to sign access token".to_string()
    })
}

/// Verifies signature and expiry and returns the embedded claims.
///
/// The token-version check against the user row is deliberately not done
/// here: it needs a database lookup and belongs to the auth middleware.
pub fn verify_access_token(token: &str, jwt_secret: &str) -> Result<JwtClaims, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let mut validation = Validation::default();
    validation.leeway = 0;

    let data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        debug!("Token verification failed: {}", e);
        "Invalid or expired token".to_string()
    })?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn sign_and_verify_roundtrip() {
        let user_id = Uuid::new_v4();
        let profile_id = Some(Uuid::new_v4());
        let token =
            sign_access_token(user_id, Role::Doctor, profile_id, 3, SECRET).unwrap();

        let claims = verify_access_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Doctor);
        assert_eq!(claims.profile_id, profile_id);
        assert_eq!(claims.version, 3);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn rejects_wrong_secret() {
        let token =
            sign_access_token(Uuid::new_v4(), Role::Patient, None, 0, SECRET).unwrap();
        assert!(verify_access_token(&token, "other-secret").is_err());
    }

    #[test]
    fn rejects_empty_secret() {
        assert!(sign_access_token(Uuid::new_v4(), Role::Patient, None, 0, "").is_err());
        assert!(verify_access_token("whatever", "").is_err());
    }

    #[test]
    fn rejects_garbage_token() {
        assert!(verify_access_token("not.a.jwt", SECRET).is_err());
    }
}
