use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::status::PaymentStatus;

/// Payment record, 1:1 with an appointment once approval occurs. Re-approval
/// after a lapsed session upserts this row instead of creating a second one.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub amount: i64,
    pub stripe_session_id: String,
    pub status: PaymentStatus,
    pub expires_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Hosted checkout session handle returned by the payment provider.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Inbound webhook event, parsed only after signature verification.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: WebhookEventObject,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventObject {
    pub id: String,
    pub client_reference_id: Option<String>,
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::AppointmentNotFound => {
                AppError::NotFound("Appointment not found".to_string())
            }
            PaymentError::Provider(msg) => AppError::ExternalService(msg),
            PaymentError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum WebhookError {
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
