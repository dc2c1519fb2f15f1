use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use shared_models::status::{AppointmentStatus, PaymentStatus};

use crate::models::PaymentError;

/// Background fallback for webhook delivery: rejects appointments whose
/// payment deadline passed without a completed session.
pub struct ExpirySweeper {
    db: PgPool,
    running: AtomicBool,
}

impl ExpirySweeper {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            running: AtomicBool::new(false),
        }
    }

    /// Spawns the sweep loop. The first tick fires after one full period.
    pub fn spawn(self: Arc<Self>, period: Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                interval.tick().await;

                if !self.try_begin() {
                    warn!("Previous expiry sweep still running, skipping this tick");
                    continue;
                }

                match self.run_cleanup().await {
                    Ok(0) => {}
                    Ok(count) => info!("Expiry sweep rejected {} lapsed appointments", count),
                    Err(e) => error!("Expiry sweep failed: {}", e),
                }

                self.finish();
            }
        });
    }

    /// Rejects every appointment with a PENDING payment past its deadline.
    /// Returns the number of appointments swept.
    pub async fn run_cleanup(&self) -> Result<u64, PaymentError> {
        let mut tx = self.db.begin().await?;

        let expired: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT id, appointment_id FROM payments \
             WHERE status = 'PENDING' AND expires_at < NOW() \
             FOR UPDATE",
        )
        .fetch_all(&mut *tx)
        .await?;

        if expired.is_empty() {
            tx.commit().await?;
            return Ok(0);
        }

        let payment_ids: Vec<Uuid> = expired.iter().map(|(id, _)| *id).collect();
        let appointment_ids: Vec<Uuid> = expired.iter().map(|(_, aid)| *aid).collect();

        // Only appointments still awaiting payment are swept; a PAID row with
        // a stale payment record is left alone.
        sqlx::query(
            "UPDATE appointments SET status = $2, updated_at = NOW() \
             WHERE id = ANY($1) AND status = 'APPROVED_UNPAID'",
        )
        .bind(&appointment_ids)
        .bind(AppointmentStatus::Rejected)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE payments SET status = $2 WHERE id = ANY($1)")
            .bind(&payment_ids)
            .bind(PaymentStatus::Failed)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(expired.len() as u64)
    }

    /// Claims the single-run guard. Returns false if a sweep is in flight.
    fn try_begin(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new().connect_lazy("postgres://localhost/unused").unwrap()
    }

    #[tokio::test]
    async fn guard_blocks_overlapping_sweeps() {
        let sweeper = ExpirySweeper::new(lazy_pool());

        assert!(sweeper.try_begin());
        assert!(!sweeper.try_begin());

        sweeper.finish();
        assert!(sweeper.try_begin());
    }
}
