use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use shared_models::status::{AppointmentStatus, PaymentStatus};

use crate::models::PaymentError;

/// Applies webhook outcomes to appointment and payment rows. Both paths run
/// in a single transaction so the two tables never disagree.
pub struct FulfillmentService {
    db: PgPool,
}

impl FulfillmentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Marks an appointment PAID after a completed checkout session.
    ///
    /// Idempotent: a second delivery of the same event finds the appointment
    /// already PAID and changes nothing.
    ///
    /// Deliberately not routed through the transition matrix: a completed
    /// session can arrive after the sweeper already rejected the appointment,
    /// and by then the patient has been charged. The captured payment wins
    /// and the provisional rejection is overturned.
    pub async fn fulfill(
        &self,
        stripe_session_id: &str,
        appointment_id: Uuid,
    ) -> Result<(), PaymentError> {
        let mut tx = self.db.begin().await?;

        let status: Option<AppointmentStatus> =
            sqlx::query_scalar("SELECT status FROM appointments WHERE id = $1 FOR UPDATE")
                .bind(appointment_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(status) = status else {
            return Err(PaymentError::AppointmentNotFound);
        };

        if status == AppointmentStatus::Paid {
            info!(
                "Appointment {} already paid, ignoring duplicate fulfillment",
                appointment_id
            );
            tx.commit().await?;
            return Ok(());
        }

        sqlx::query("UPDATE appointments SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(appointment_id)
            .bind(AppointmentStatus::Paid)
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query(
            "UPDATE payments SET status = $3, paid_at = NOW() \
             WHERE appointment_id = $1 AND stripe_session_id = $2",
        )
        .bind(appointment_id)
        .bind(stripe_session_id)
        .bind(PaymentStatus::Succeeded)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            warn!(
                "No payment row matched session {} for appointment {}",
                stripe_session_id, appointment_id
            );
        }

        tx.commit().await?;
        info!("Appointment {} fulfilled as paid", appointment_id);
        Ok(())
    }

    /// Rejects an appointment whose checkout session lapsed unpaid.
    pub async fn cancel_expired(&self, appointment_id: Uuid) -> Result<(), PaymentError> {
        let mut tx = self.db.begin().await?;

        let status: Option<AppointmentStatus> =
            sqlx::query_scalar("SELECT status FROM appointments WHERE id = $1 FOR UPDATE")
                .bind(appointment_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(status) = status else {
            return Err(PaymentError::AppointmentNotFound);
        };

        // A session-expired event racing a completed one must not undo the
        // payment.
        if status == AppointmentStatus::Paid {
            info!(
                "Appointment {} already paid, ignoring expired session",
                appointment_id
            );
            tx.commit().await?;
            return Ok(());
        }

        sqlx::query("UPDATE appointments SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(appointment_id)
            .bind(AppointmentStatus::Rejected)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE payments SET status = $2 \
             WHERE appointment_id = $1 AND status = 'PENDING'",
        )
        .bind(appointment_id)
        .bind(PaymentStatus::Failed)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            "Appointment {} rejected after payment window lapsed",
            appointment_id
        );
        Ok(())
    }
}
