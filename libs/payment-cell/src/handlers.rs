use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::error::AppError;

use crate::services::fulfillment::FulfillmentService;
use crate::services::webhook;

/// Payment provider webhook. Unauthenticated by design; trust comes from the
/// signature over the raw body, so the body must not be consumed as JSON
/// before verification.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing stripe-signature header".to_string()))?;

    webhook::verify_signature(
        &body,
        signature,
        &state.config.stripe_webhook_secret,
        Utc::now().timestamp(),
    )?;

    let event = webhook::parse_event(&body)?;

    let fulfillment = FulfillmentService::new(state.db.clone());

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let appointment_id = parse_reference(&event.data.object.client_reference_id)?;
            info!(
                "Checkout session {} completed for appointment {}",
                event.data.object.id, appointment_id
            );
            // Surface DB failures so the provider retries the delivery.
            fulfillment
                .fulfill(&event.data.object.id, appointment_id)
                .await?;
        }
        "checkout.session.expired" => {
            let appointment_id = parse_reference(&event.data.object.client_reference_id)?;
            info!(
                "Checkout session {} expired for appointment {}",
                event.data.object.id, appointment_id
            );
            // The sweeper covers this case too, so a failure here is logged
            // and the delivery acknowledged.
            if let Err(e) = fulfillment.cancel_expired(appointment_id).await {
                error!(
                    "Failed to cancel appointment {} on expired session: {}",
                    appointment_id, e
                );
            }
        }
        other => {
            warn!("Ignoring unhandled webhook event type: {}", other);
        }
    }

    Ok(Json(json!({ "received": true })))
}

fn parse_reference(reference: &Option<String>) -> Result<Uuid, AppError> {
    reference
        .as_deref()
        .and_then(|r| Uuid::parse_str(r).ok())
        .ok_or_else(|| AppError::BadRequest("Missing or invalid client reference".to_string()))
}
