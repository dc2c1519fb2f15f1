use base64::Engine;
use chrono::NaiveTime;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use shared_database::{is_unique_violation, BlobStorage};
use shared_models::status::AppointmentStatus;

use crate::models::{Appointment, BookAppointmentRequest, BookingError};

/// Creates and lists appointments. The booking path is the write-contended
/// one: two patients racing for the same slot are serialized by the unique
/// constraint on (doctor_id, date, time_slot).
pub struct BookingService {
    db: PgPool,
    storage: BlobStorage,
}

impl BookingService {
    pub fn new(db: PgPool, storage: BlobStorage) -> Self {
        Self { db, storage }
    }

    pub async fn create_appointment(
        &self,
        patient_user_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        if NaiveTime::parse_from_str(&request.time_slot, "%H:%M").is_err() {
            return Err(BookingError::Validation(format!(
                "Invalid time slot '{}', expected HH:MM",
                request.time_slot
            )));
        }

        let patient_id: Uuid =
            sqlx::query_scalar("SELECT id FROM patient_profiles WHERE user_id = $1")
                .bind(patient_user_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or(BookingError::PatientNotFound)?;

        let doctor_id: Uuid =
            sqlx::query_scalar("SELECT id FROM doctor_profiles WHERE user_id = $1")
                .bind(request.doctor_user_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or(BookingError::DoctorNotFound)?;

        // Upload outside the transaction; an orphaned object on a failed
        // booking is acceptable, a transaction held open across an HTTP
        // round-trip is not.
        let report_url = match &request.report_base64 {
            Some(encoded) => {
                let data = base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| BookingError::Validation(format!("Invalid report data: {}", e)))?;
                let content_type = request
                    .report_content_type
                    .as_deref()
                    .unwrap_or("application/pdf");
                let url = self
                    .storage
                    .upload(data, "reports", content_type)
                    .await
                    .map_err(|e| BookingError::ExternalService(e.to_string()))?;
                Some(url)
            }
            None => None,
        };

        let reason = request
            .reason
            .clone()
            .unwrap_or_else(|| "General Consultation".to_string());

        let mut tx = self.db.begin().await?;

        let existing: Option<(Uuid, AppointmentStatus)> = sqlx::query_as(
            "SELECT id, status FROM appointments \
             WHERE doctor_id = $1 AND date = $2 AND time_slot = $3 \
             FOR UPDATE",
        )
        .bind(doctor_id)
        .bind(request.date)
        .bind(&request.time_slot)
        .fetch_optional(&mut *tx)
        .await?;

        let appointment = match existing {
            Some((_, status)) if status.blocks_slot() => {
                return Err(BookingError::SlotAlreadyBooked);
            }
            Some((id, _)) => {
                // A rejected appointment does not hold the slot; the new
                // booking takes over the row so the unique constraint holds.
                info!("Reclaiming rejected appointment {} for a new booking", id);
                sqlx::query_as::<_, Appointment>(
                    "UPDATE appointments \
                     SET patient_id = $2, status = 'PENDING', reason = $3, symptoms = $4, \
                         report_url = $5, updated_at = NOW() \
                     WHERE id = $1 \
                     RETURNING *",
                )
                .bind(id)
                .bind(patient_id)
                .bind(&reason)
                .bind(&request.symptoms)
                .bind(&report_url)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                let inserted = sqlx::query_as::<_, Appointment>(
                    "INSERT INTO appointments \
                         (doctor_id, patient_id, date, time_slot, reason, symptoms, report_url) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) \
                     RETURNING *",
                )
                .bind(doctor_id)
                .bind(patient_id)
                .bind(request.date)
                .bind(&request.time_slot)
                .bind(&reason)
                .bind(&request.symptoms)
                .bind(&report_url)
                .fetch_one(&mut *tx)
                .await;

                match inserted {
                    Ok(appointment) => appointment,
                    Err(e) if is_unique_violation(&e) => {
                        warn!(
                            "Lost booking race for doctor {} on {} at {}",
                            doctor_id, request.date, request.time_slot
                        );
                        return Err(BookingError::SlotAlreadyBooked);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        tx.commit().await?;
        info!(
            "Appointment {} booked for doctor {} on {} at {}",
            appointment.id, doctor_id, request.date, request.time_slot
        );
        Ok(appointment)
    }

    pub async fn list_for_patient(
        &self,
        patient_user_id: Uuid,
    ) -> Result<Vec<Appointment>, BookingError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            "SELECT a.* FROM appointments a \
             JOIN patient_profiles p ON p.id = a.patient_id \
             WHERE p.user_id = $1 \
             ORDER BY a.date DESC, a.time_slot DESC",
        )
        .bind(patient_user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(appointments)
    }

    pub async fn list_for_doctor(
        &self,
        doctor_user_id: Uuid,
    ) -> Result<Vec<Appointment>, BookingError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            "SELECT a.* FROM appointments a \
             JOIN doctor_profiles d ON d.id = a.doctor_id \
             WHERE d.user_id = $1 \
             ORDER BY a.date DESC, a.time_slot DESC",
        )
        .bind(doctor_user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(appointments)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    #[test]
    fn time_slot_format_is_wall_clock() {
        assert!(NaiveTime::parse_from_str("09:30", "%H:%M").is_ok());
        assert!(NaiveTime::parse_from_str("23:59", "%H:%M").is_ok());
        assert!(NaiveTime::parse_from_str("9:30am", "%H:%M").is_err());
        assert!(NaiveTime::parse_from_str("25:00", "%H:%M").is_err());
        assert!(NaiveTime::parse_from_str("", "%H:%M").is_err());
    }
}
