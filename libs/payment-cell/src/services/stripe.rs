use chrono::Utc;
use reqwest::Client;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{CheckoutSession, PaymentError};

/// Fixed validity window for a payment after approval. The provider expires
/// the hosted session at the same deadline the sweeper enforces on our side.
pub const PAYMENT_WINDOW_SECS: i64 = 3 * 60 * 60;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Checkout-session client for the hosted payment page. One session per
/// approval, tied back to the appointment through `client_reference_id`.
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: String,
    frontend_url: String,
}

impl StripeClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: STRIPE_API_BASE.to_string(),
            secret_key: config.stripe_secret_key.clone(),
            frontend_url: config.frontend_url.clone(),
        }
    }

    /// Override the API base URL, for tests against a mock server.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.to_string();
        self
    }

    pub async fn create_checkout_session(
        &self,
        appointment_id: Uuid,
        amount: i64,
        customer_email: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        debug!("Creating checkout session for appointment {}", appointment_id);

        let expires_at = Utc::now().timestamp() + PAYMENT_WINDOW_SECS;
        let unit_amount = (amount * 100).to_string(); // provider expects minor units
        let reference = appointment_id.to_string();
        let expires_at_str = expires_at.to_string();

        let params: Vec<(&str, &str)> = vec![
            ("payment_method_types[0]", "card"),
            ("line_items[0][price_data][currency]", "inr"),
            (
                "line_items[0][price_data][product_data][name]",
                "Doctor Consultation Fee",
            ),
            ("line_items[0][price_data][unit_amount]", &unit_amount),
            ("line_items[0][quantity]", "1"),
            ("mode", "payment"),
            ("customer_email", customer_email),
            ("client_reference_id", &reference),
            ("expires_at", &expires_at_str),
        ];

        let success_url = format!(
            "{}/payment-success?session_id={{CHECKOUT_SESSION_ID}}",
            self.frontend_url
        );
        let cancel_url = format!("{}/payment-cancelled", self.frontend_url);

        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(
                &params
                    .into_iter()
                    .chain([
                        ("success_url", success_url.as_str()),
                        ("cancel_url", cancel_url.as_str()),
                    ])
                    .collect::<Vec<_>>(),
            )
            .send()
            .await
            .map_err(|e| PaymentError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Checkout session creation failed ({}): {}", status, error_text);
            return Err(PaymentError::Provider(format!(
                "Checkout session creation failed ({})",
                status
            )));
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| PaymentError::Provider(e.to_string()))?;

        debug!("Checkout session created: {}", session.id);
        Ok(session)
    }
}
