use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use tracing::debug;
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;

use crate::models::{
    AvailableSlotsResponse, DoctorProfile, SetAvailabilityRequest, SlotsQuery, WeeklySchedule,
};
use crate::services::schedule::ScheduleService;
use crate::services::slots::SlotService;

fn require_doctor(user: &AuthUser) -> Result<(), AppError> {
    if user.role != Role::Doctor {
        return Err(AppError::Forbidden("Doctor role required".to_string()));
    }
    Ok(())
}

pub async fn set_availability(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<Json<WeeklySchedule>, AppError> {
    require_doctor(&user)?;
    debug!("Doctor {} updating availability", user.user_id);

    let service = ScheduleService::new(state.db.clone());
    let schedule = service.set_availability(user.user_id, request).await?;

    Ok(Json(schedule))
}

pub async fn get_my_availability(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<WeeklySchedule>>, AppError> {
    require_doctor(&user)?;

    let service = ScheduleService::new(state.db.clone());
    let schedules = service.get_availability(user.user_id).await?;

    Ok(Json(schedules))
}

pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DoctorProfile>>, AppError> {
    let service = ScheduleService::new(state.db.clone());
    let doctors = service.list_doctors().await?;

    Ok(Json(doctors))
}

pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_user_id): Path<Uuid>,
) -> Result<Json<DoctorProfile>, AppError> {
    let service = ScheduleService::new(state.db.clone());
    let doctor = service.doctor_by_user_id(doctor_user_id).await?;

    Ok(Json(doctor))
}

pub async fn get_available_slots(
    State(state): State<Arc<AppState>>,
    Path(doctor_user_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<AvailableSlotsResponse>, AppError> {
    let service = SlotService::new(state.db.clone());
    let slots = service.available_slots(doctor_user_id, query.date).await?;

    Ok(Json(AvailableSlotsResponse {
        date: query.date,
        slots,
    }))
}
