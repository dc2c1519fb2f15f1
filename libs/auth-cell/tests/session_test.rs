//! Pure validation tests run standalone; the session and reset flows at the
//! bottom need a migrated database:
//!
//!     DATABASE_URL=postgres://... cargo test -p auth-cell -- --ignored

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use auth_cell::models::RegisterRequest;
use auth_cell::services::password_reset::PasswordResetService;
use auth_cell::{SessionError, SessionService};
use shared_config::AppConfig;
use shared_models::auth::Role;
use shared_utils::mailer::Mailer;

fn service() -> SessionService {
    // Lazy pool: validation failures return before any connection is made.
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/unused")
        .unwrap();
    SessionService::new(pool, "test-secret".to_string())
}

fn request() -> RegisterRequest {
    RegisterRequest {
        email: "pat@example.com".to_string(),
        password: "long enough password".to_string(),
        name: "Pat".to_string(),
        role: Role::Patient,
        specialization: None,
        city: None,
        phone: None,
    }
}

#[tokio::test]
async fn register_rejects_invalid_email() {
    let result = service()
        .register(RegisterRequest {
            email: "not-an-email".to_string(),
            ..request()
        })
        .await;
    assert_matches!(result, Err(SessionError::Validation(_)));
}

#[tokio::test]
async fn register_rejects_short_password() {
    let result = service()
        .register(RegisterRequest {
            password: "short".to_string(),
            ..request()
        })
        .await;
    assert_matches!(result, Err(SessionError::Validation(_)));
}

#[tokio::test]
async fn register_rejects_blank_name() {
    let result = service()
        .register(RegisterRequest {
            name: "   ".to_string(),
            ..request()
        })
        .await;
    assert_matches!(result, Err(SessionError::Validation(_)));
}

async fn connect() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect to test database")
}

fn unique_request() -> RegisterRequest {
    RegisterRequest {
        email: format!("user-{}@test.local", Uuid::new_v4()),
        ..request()
    }
}

#[tokio::test]
#[ignore]
async fn duplicate_email_registration_conflicts() {
    let service = SessionService::new(connect().await, "test-secret".to_string());
    let req = unique_request();

    service.register(req.clone()).await.unwrap();
    let second = service.register(req).await;

    assert_matches!(second, Err(SessionError::EmailTaken));
}

#[tokio::test]
#[ignore]
async fn second_login_revokes_the_first_refresh_token() {
    let db = connect().await;
    let service = SessionService::new(db, "test-secret".to_string());
    let req = unique_request();
    let email = req.email.clone();
    let password = req.password.clone();

    let first = service.register(req).await.unwrap();
    let second = service.login(&email, &password).await.unwrap();

    // Single active session: the earlier device is logged out.
    assert_matches!(
        service.refresh(&first.refresh_token).await,
        Err(SessionError::InvalidOrExpiredSession)
    );
    assert!(service.refresh(&second.refresh_token).await.is_ok());
}

#[tokio::test]
#[ignore]
async fn password_reset_kills_sessions_and_is_single_use() {
    let db = connect().await;
    let service = SessionService::new(db.clone(), "test-secret".to_string());
    let req = unique_request();
    let email = req.email.clone();
    let old_password = req.password.clone();

    let auth = service.register(req).await.unwrap();

    // Place a live reset token directly; only its SHA-256 digest is stored.
    let token = Uuid::new_v4().simple().to_string();
    sqlx::query(
        "INSERT INTO password_reset_tokens (token_hash, user_id, expires_at) \
         VALUES ($1, $2, $3)",
    )
    .bind(hex::encode(Sha256::digest(token.as_bytes())))
    .bind(auth.user_id)
    .bind(Utc::now() + Duration::minutes(10))
    .execute(&db)
    .await
    .unwrap();

    let config = AppConfig {
        database_url: String::new(),
        jwt_secret: "test-secret".to_string(),
        stripe_secret_key: String::new(),
        stripe_webhook_secret: String::new(),
        frontend_url: "http://localhost:3000".to_string(),
        email_api_url: String::new(),
        email_api_key: String::new(),
        email_from: String::new(),
        storage_url: String::new(),
        storage_api_key: String::new(),
        port: 0,
    };
    let reset = PasswordResetService::new(
        db.clone(),
        Mailer::new(&config),
        config.frontend_url.clone(),
    );
    reset
        .reset_password(&token, "a brand new password")
        .await
        .unwrap();

    // Every refresh token is dropped and the version bump voids outstanding
    // access tokens.
    assert_matches!(
        service.refresh(&auth.refresh_token).await,
        Err(SessionError::InvalidOrExpiredSession)
    );
    let version: i32 = sqlx::query_scalar("SELECT token_version FROM users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(version, 1);

    assert_matches!(
        service.login(&email, &old_password).await,
        Err(SessionError::InvalidCredentials)
    );
    assert!(service.login(&email, "a brand new password").await.is_ok());

    // A consumed token cannot be replayed.
    assert_matches!(
        reset.reset_password(&token, "yet another password").await,
        Err(SessionError::InvalidOrExpiredToken)
    );
}
