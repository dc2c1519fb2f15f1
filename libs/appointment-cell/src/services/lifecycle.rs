use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use payment_cell::{Payment, StripeClient, PAYMENT_WINDOW_SECS};
use shared_models::status::{AppointmentStatus, PaymentStatus};
use shared_utils::mailer::Mailer;

use crate::models::{Appointment, ApproveResponse, BookingError};

/// The only legal moves through the appointment lifecycle. PENDING and
/// APPROVED_UNPAID each have two exits; PAID and REJECTED have none.
pub fn validate_status_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), BookingError> {
    use AppointmentStatus::*;

    let allowed = matches!(
        (from, to),
        (Pending, ApprovedUnpaid) | (Pending, Rejected) | (ApprovedUnpaid, Paid) | (ApprovedUnpaid, Rejected)
    );

    if allowed {
        Ok(())
    } else {
        Err(BookingError::InvalidStatusTransition { from, to })
    }
}

/// Doctor-side approve/reject. Approval opens the payment window; the
/// PAID transition itself belongs to the webhook, never to this service.
pub struct LifecycleService {
    db: PgPool,
    stripe: StripeClient,
    mailer: Mailer,
}

impl LifecycleService {
    pub fn new(db: PgPool, stripe: StripeClient, mailer: Mailer) -> Self {
        Self { db, stripe, mailer }
    }

    pub async fn approve(
        &self,
        doctor_user_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<ApproveResponse, BookingError> {
        let appointment = self
            .appointment_owned_by(doctor_user_id, appointment_id)
            .await?;

        validate_status_transition(appointment.status, AppointmentStatus::ApprovedUnpaid)?;

        let fees: Option<i64> = sqlx::query_scalar("SELECT fees FROM doctor_profiles WHERE id = $1")
            .bind(appointment.doctor_id)
            .fetch_one(&self.db)
            .await?;
        let fees = fees.ok_or(BookingError::DoctorFeesNotSet)?;

        let patient_email: String = sqlx::query_scalar(
            "SELECT u.email FROM patient_profiles p \
             JOIN users u ON u.id = p.user_id \
             WHERE p.id = $1",
        )
        .bind(appointment.patient_id)
        .fetch_one(&self.db)
        .await?;

        // The provider call happens before any row changes; if it fails the
        // appointment stays PENDING and approve can be retried.
        let session = self
            .stripe
            .create_checkout_session(appointment.id, fees, &patient_email)
            .await
            .map_err(|e| BookingError::ExternalService(e.to_string()))?;

        let expires_at = Utc::now() + Duration::seconds(PAYMENT_WINDOW_SECS);

        let mut tx = self.db.begin().await?;

        let appointment = sqlx::query_as::<_, Appointment>(
            "UPDATE appointments SET status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(appointment.id)
        .bind(AppointmentStatus::ApprovedUnpaid)
        .fetch_one(&mut *tx)
        .await?;

        // Re-approval after a lapsed window reuses the payment row with a
        // fresh session and deadline.
        let payment = sqlx::query_as::<_, Payment>(
            "INSERT INTO payments (appointment_id, amount, stripe_session_id, status, expires_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (appointment_id) DO UPDATE \
             SET amount = EXCLUDED.amount, \
                 stripe_session_id = EXCLUDED.stripe_session_id, \
                 status = EXCLUDED.status, \
                 expires_at = EXCLUDED.expires_at, \
                 paid_at = NULL \
             RETURNING *",
        )
        .bind(appointment.id)
        .bind(fees)
        .bind(&session.id)
        .bind(PaymentStatus::Pending)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            "Appointment {} approved, payment window open until {}",
            appointment.id, expires_at
        );

        let email_body = format!(
            "<p>Your appointment on {} at {} has been approved.</p>\
             <p><a href=\"{}\">Complete your payment</a> within 3 hours to confirm it.</p>",
            appointment.date, appointment.time_slot, session.url
        );
        if let Err(e) = self
            .mailer
            .send(&patient_email, "Appointment approved - payment required", &email_body)
            .await
        {
            error!(
                "Failed to send approval email for appointment {}: {}",
                appointment.id, e
            );
        }

        Ok(ApproveResponse {
            appointment,
            payment,
            payment_url: session.url,
        })
    }

    pub async fn reject(
        &self,
        doctor_user_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, BookingError> {
        let appointment = self
            .appointment_owned_by(doctor_user_id, appointment_id)
            .await?;

        validate_status_transition(appointment.status, AppointmentStatus::Rejected)?;

        let mut tx = self.db.begin().await?;

        let appointment = sqlx::query_as::<_, Appointment>(
            "UPDATE appointments SET status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(appointment.id)
        .bind(AppointmentStatus::Rejected)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE payments SET status = $2 \
             WHERE appointment_id = $1 AND status = 'PENDING'",
        )
        .bind(appointment.id)
        .bind(PaymentStatus::Failed)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Appointment {} rejected by doctor", appointment.id);
        Ok(appointment)
    }

    async fn appointment_owned_by(
        &self,
        doctor_user_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, BookingError> {
        sqlx::query_as::<_, Appointment>(
            "SELECT a.* FROM appointments a \
             JOIN doctor_profiles d ON d.id = a.doctor_id \
             WHERE a.id = $1 AND d.user_id = $2",
        )
        .bind(appointment_id)
        .bind(doctor_user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(BookingError::NotFound)
    }
}
