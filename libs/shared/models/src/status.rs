use serde::{Deserialize, Serialize};
use std::fmt;

/// Appointment lifecycle states.
///
/// PENDING -> {APPROVED_UNPAID, REJECTED}; APPROVED_UNPAID -> {PAID, REJECTED};
/// PAID and REJECTED are terminal. The transition matrix lives in
/// `appointment-cell::services::lifecycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    ApprovedUnpaid,
    Rejected,
    Paid,
}

impl AppointmentStatus {
    /// Statuses that occupy a slot for availability display. REJECTED rows do
    /// not block a slot; booking reclaims them in place.
    pub fn blocks_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Rejected)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "PENDING"),
            AppointmentStatus::ApprovedUnpaid => write!(f, "APPROVED_UNPAID"),
            AppointmentStatus::Rejected => write!(f, "REJECTED"),
            AppointmentStatus::Paid => write!(f, "PAID"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Succeeded => write!(f, "SUCCEEDED"),
            PaymentStatus::Failed => write!(f, "FAILED"),
        }
    }
}
