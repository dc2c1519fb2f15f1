use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

/// A doctor's recurring working-hours template for one day of the week.
/// At most one row per (doctor_id, day_of_week); updates replace in place.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeeklySchedule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i32,
    pub is_bookable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub specialization: String,
    pub registration_number: String,
    pub fees: Option<i64>,
    pub city: Option<String>,
}

/// Wall-clock times come over the wire as "HH:MM" strings and are parsed
/// before they reach the store.
#[derive(Debug, Clone, Deserialize)]
pub struct SetAvailabilityRequest {
    pub day_of_week: i16,
    pub start_time: String,
    pub end_time: String,
    pub slot_duration_minutes: i32,
    #[serde(default = "default_bookable")]
    pub is_bookable: bool,
}

fn default_bookable() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotsQuery {
    pub date: chrono::NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableSlotsResponse {
    pub date: chrono::NaiveDate,
    pub slots: Vec<String>,
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
            ScheduleError::Validation(msg) => AppError::ValidationError(msg),
            ScheduleError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
