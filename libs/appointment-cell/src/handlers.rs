use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use tracing::debug;
use uuid::Uuid;

use payment_cell::StripeClient;
use shared_database::{AppState, BlobStorage};
use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;
use shared_utils::mailer::Mailer;

use crate::models::{Appointment, ApproveResponse, BookAppointmentRequest};
use crate::services::booking::BookingService;
use crate::services::lifecycle::LifecycleService;

fn require_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden(format!("{} role required", role)));
    }
    Ok(())
}

pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    require_role(&user, Role::Patient)?;
    debug!(
        "Patient {} booking doctor {} on {} at {}",
        user.user_id, request.doctor_user_id, request.date, request.time_slot
    );

    let service = BookingService::new(state.db.clone(), BlobStorage::new(&state.config));
    let appointment = service.create_appointment(user.user_id, request).await?;

    Ok(Json(appointment))
}

pub async fn my_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    require_role(&user, Role::Patient)?;

    let service = BookingService::new(state.db.clone(), BlobStorage::new(&state.config));
    let appointments = service.list_for_patient(user.user_id).await?;

    Ok(Json(appointments))
}

pub async fn doctor_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    require_role(&user, Role::Doctor)?;

    let service = BookingService::new(state.db.clone(), BlobStorage::new(&state.config));
    let appointments = service.list_for_doctor(user.user_id).await?;

    Ok(Json(appointments))
}

pub async fn approve_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApproveResponse>, AppError> {
    require_role(&user, Role::Doctor)?;
    debug!("Doctor {} approving appointment {}", user.user_id, appointment_id);

    let service = lifecycle_service(&state);
    let response = service.approve(user.user_id, appointment_id).await?;

    Ok(Json(response))
}

pub async fn reject_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    require_role(&user, Role::Doctor)?;
    debug!("Doctor {} rejecting appointment {}", user.user_id, appointment_id);

    let service = lifecycle_service(&state);
    let appointment = service.reject(user.user_id, appointment_id).await?;

    Ok(Json(appointment))
}

fn lifecycle_service(state: &AppState) -> LifecycleService {
    LifecycleService::new(
        state.db.clone(),
        StripeClient::new(&state.config),
        Mailer::new(&state.config),
    )
}
