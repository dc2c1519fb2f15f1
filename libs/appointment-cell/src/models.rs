use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use payment_cell::Payment;
use shared_models::error::AppError;
use shared_models::status::AppointmentStatus;

/// A booked consultation. The (doctor_id, date, time_slot) triple is unique
/// in the store; a REJECTED row is the only kind a new booking may overwrite.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: String,
    pub status: AppointmentStatus,
    pub reason: String,
    pub symptoms: Option<String>,
    pub report_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_user_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: String,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
    /// Optional medical report, base64-encoded. Uploaded to blob storage
    /// before the booking transaction opens.
    pub report_base64: Option<String>,
    pub report_content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApproveResponse {
    pub appointment: Appointment,
    pub payment: Payment,
    pub payment_url: String,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient profile not found")]
    PatientNotFound,

    #[error("This slot is already booked")]
    SlotAlreadyBooked,

    #[error("Doctor has not set consultation fees")]
    DoctorFeesNotSet,

    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
            BookingError::PatientNotFound => {
                AppError::NotFound("Patient profile not found".to_string())
            }
            BookingError::SlotAlreadyBooked => {
                AppError::Conflict("This slot is already booked".to_string())
            }
            BookingError::DoctorFeesNotSet => {
                AppError::BadRequest("Doctor has not set consultation fees".to_string())
            }
            BookingError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            BookingError::InvalidStatusTransition { from, to } => AppError::Conflict(format!(
                "Invalid status transition from {} to {}",
                from, to
            )),
            BookingError::Validation(msg) => AppError::ValidationError(msg),
            BookingError::Database(e) => AppError::Database(e.to_string()),
            BookingError::ExternalService(msg) => AppError::ExternalService(msg),
        }
    }
}
