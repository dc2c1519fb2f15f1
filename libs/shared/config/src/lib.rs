use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub frontend_url: String,
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
    pub storage_url: String,
    pub storage_api_key: String,
    pub port: u16,
}

fn env_or_warn(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", name);
        String::new()
    })
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_url: env_or_warn("DATABASE_URL"),
            jwt_secret: env_or_warn("JWT_SECRET"),
            stripe_secret_key: env_or_warn("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: env_or_warn("STRIPE_WEBHOOK_SECRET"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            email_api_url: env_or_warn("EMAIL_API_URL"),
            email_api_key: env_or_warn("EMAIL_API_KEY"),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "HealSync Support <support@healsync.com>".to_string()),
            storage_url: env_or_warn("STORAGE_URL"),
            storage_api_key: env_or_warn("STORAGE_API_KEY"),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_url.is_empty() && !self.jwt_secret.is_empty()
    }

    pub fn is_payments_configured(&self) -> bool {
        !self.stripe_secret_key.is_empty() && !self.stripe_webhook_secret.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.email_api_url.is_empty() && !self.email_api_key.is_empty()
    }
}
