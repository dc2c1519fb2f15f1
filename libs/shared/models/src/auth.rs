use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account role. Doctors and patients share identity fields but carry
/// distinct profile schemas, so downstream code matches on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Doctor,
    Patient,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Doctor => write!(f, "DOCTOR"),
            Role::Patient => write!(f, "PATIENT"),
        }
    }
}

/// Claims embedded in the signed access token.
///
/// `version` is the per-user token version counter: incrementing it on the
/// user row invalidates every previously issued access token regardless of
/// its own `exp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Uuid,
    pub role: Role,
    pub profile_id: Option<Uuid>,
    pub version: i32,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated request context, inserted into request extensions by the
/// auth middleware after signature, expiry and token-version checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
    pub profile_id: Option<Uuid>,
}
