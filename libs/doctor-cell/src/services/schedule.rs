use chrono::NaiveTime;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::{DoctorProfile, ScheduleError, SetAvailabilityRequest, WeeklySchedule};

pub struct ScheduleService {
    db: PgPool,
}

impl ScheduleService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create or replace the availability template for one weekday. The
    /// (doctor_id, day_of_week) uniqueness constraint makes this an in-place
    /// upsert; templates are never auto-deleted, `is_bookable=false` merely
    /// suppresses slot generation.
    pub async fn set_availability(
        &self,
        doctor_user_id: Uuid,
        request: SetAvailabilityRequest,
    ) -> Result<WeeklySchedule, ScheduleError> {
        debug!(
            "Setting availability for doctor user {} on weekday {}",
            doctor_user_id, request.day_of_week
        );

        if !(0..=6).contains(&request.day_of_week) {
            return Err(ScheduleError::Validation(
                "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }

        if request.slot_duration_minutes <= 0 {
            return Err(ScheduleError::Validation(
                "Slot duration must be a positive number of minutes".to_string(),
            ));
        }

        let start_time = parse_wall_clock(&request.start_time)?;
        let end_time = parse_wall_clock(&request.end_time)?;

        if start_time >= end_time {
            return Err(ScheduleError::Validation(
                "Start time must be before end time".to_string(),
            ));
        }

        let doctor = self.doctor_by_user_id(doctor_user_id).await?;

        let schedule: WeeklySchedule = sqlx::query_as(
            r#"
            INSERT INTO weekly_schedules
                (doctor_id, day_of_week, start_time, end_time, slot_duration_minutes, is_bookable)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (doctor_id, day_of_week) DO UPDATE SET
                start_time = EXCLUDED.start_time,
                end_time = EXCLUDED.end_time,
                slot_duration_minutes = EXCLUDED.slot_duration_minutes,
                is_bookable = EXCLUDED.is_bookable
            RETURNING *
            "#,
        )
        .bind(doctor.id)
        .bind(request.day_of_week)
        .bind(start_time)
        .bind(end_time)
        .bind(request.slot_duration_minutes)
        .bind(request.is_bookable)
        .fetch_one(&self.db)
        .await?;

        debug!("Availability stored with ID: {}", schedule.id);
        Ok(schedule)
    }

    pub async fn get_availability(
        &self,
        doctor_user_id: Uuid,
    ) -> Result<Vec<WeeklySchedule>, ScheduleError> {
        let doctor = self.doctor_by_user_id(doctor_user_id).await?;

        let schedules = sqlx::query_as(
            "SELECT * FROM weekly_schedules WHERE doctor_id = $1 ORDER BY day_of_week ASC",
        )
        .bind(doctor.id)
        .fetch_all(&self.db)
        .await?;

        Ok(schedules)
    }

    /// List all doctors for the public directory.
    pub async fn list_doctors(&self) -> Result<Vec<DoctorProfile>, ScheduleError> {
        let doctors = sqlx::query_as("SELECT * FROM doctor_profiles ORDER BY name ASC")
            .fetch_all(&self.db)
            .await?;

        Ok(doctors)
    }

    pub async fn doctor_by_user_id(
        &self,
        doctor_user_id: Uuid,
    ) -> Result<DoctorProfile, ScheduleError> {
        sqlx::query_as("SELECT * FROM doctor_profiles WHERE user_id = $1")
            .bind(doctor_user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(ScheduleError::DoctorNotFound)
    }
}

pub(crate) fn parse_wall_clock(value: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| ScheduleError::Validation(format!("Invalid time '{}', expected HH:MM", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wall_clock_times() {
        assert_eq!(
            parse_wall_clock("09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(parse_wall_clock("9am").is_err());
        assert!(parse_wall_clock("25:00").is_err());
    }
}
