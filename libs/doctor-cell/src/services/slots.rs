use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::{ScheduleError, WeeklySchedule};

/// Weekday index for a civil calendar date, 0 = Sunday through 6 = Saturday.
///
/// Computed on the `NaiveDate` directly. Routing a `YYYY-MM-DD` string
/// through an instant-in-time representation shifts the weekday by a day
/// near midnight in non-UTC offsets, which silently moves every slot.
pub fn day_of_week(date: NaiveDate) -> i16 {
    date.weekday().num_days_from_sunday() as i16
}

/// Expand a weekday template into bookable "HH:MM" strings.
///
/// Walks from `start_time` in `slot_duration_minutes` steps, stopping
/// strictly before `end_time`, and omits any time present in `taken`. Pure
/// and fully materialized; slot counts are bounded by a working day divided
/// by the slot duration.
pub fn generate_slots(schedule: &WeeklySchedule, taken: &HashSet<String>) -> Vec<String> {
    if !schedule.is_bookable {
        return Vec::new();
    }

    let step = Duration::minutes(schedule.slot_duration_minutes as i64);
    let mut slots = Vec::new();
    let mut current = schedule.start_time;

    while current < schedule.end_time {
        let slot = current.format("%H:%M").to_string();
        if !taken.contains(&slot) {
            slots.push(slot);
        }
        current += step;
        // NaiveTime arithmetic wraps at midnight; a wrapped cursor means the
        // window is exhausted.
        if current <= schedule.start_time {
            break;
        }
    }

    slots
}

pub struct SlotService {
    db: PgPool,
}

impl SlotService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Concrete bookable slots for a doctor on a calendar date. A missing
    /// doctor, missing template or unbookable day all yield an empty list,
    /// not an error: "nothing to book" is a normal answer.
    pub async fn available_slots(
        &self,
        doctor_user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<String>, ScheduleError> {
        let weekday = day_of_week(date);
        debug!(
            "Generating slots for doctor user {} on {} (weekday {})",
            doctor_user_id, date, weekday
        );

        let doctor_id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM doctor_profiles WHERE user_id = $1")
                .bind(doctor_user_id)
                .fetch_optional(&self.db)
                .await?;

        let Some(doctor_id) = doctor_id else {
            return Ok(Vec::new());
        };

        let schedule: Option<WeeklySchedule> = sqlx::query_as(
            "SELECT * FROM weekly_schedules WHERE doctor_id = $1 AND day_of_week = $2",
        )
        .bind(doctor_id)
        .bind(weekday)
        .fetch_optional(&self.db)
        .await?;

        let Some(schedule) = schedule else {
            return Ok(Vec::new());
        };

        // REJECTED appointments do not block a slot; booking reclaims the
        // underlying row in place.
        let taken_rows: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT time_slot FROM appointments
            WHERE doctor_id = $1
              AND date = $2
              AND status IN ('PENDING', 'APPROVED_UNPAID', 'PAID')
            "#,
        )
        .bind(doctor_id)
        .bind(date)
        .fetch_all(&self.db)
        .await?;

        let taken: HashSet<String> = taken_rows.into_iter().collect();
        let slots = generate_slots(&schedule, &taken);

        debug!("Found {} available slots", slots.len());
        Ok(slots)
    }
}
