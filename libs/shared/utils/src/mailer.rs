use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Outbound email over an HTTP mail API. Delivery is best-effort at the call
/// sites: an approval or reset request that already committed is never rolled
/// back because the notification failed.
pub struct Mailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl Mailer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.email_api_url.clone(),
            api_key: config.email_api_key.clone(),
            from: config.email_from.clone(),
        }
    }

    pub async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        if self.api_url.is_empty() {
            return Err(anyhow!("Email API is not configured"));
        }

        debug!("Sending email to {}: {}", to, subject);

        let response = self
            .client
            .post(format!("{}/send", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "html": html_body,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Email API error ({}): {}", status, error_text);
            return Err(anyhow!("Email API error ({}): {}", status, error_text));
        }

        Ok(())
    }
}
