//! Booking tests against a live Postgres. Run with a migrated database:
//!
//!     DATABASE_URL=postgres://... cargo test -p appointment-cell -- --ignored

use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use appointment_cell::models::{BookAppointmentRequest, BookingError};
use appointment_cell::services::booking::BookingService;
use shared_config::AppConfig;
use shared_database::BlobStorage;
use shared_models::status::AppointmentStatus;

async fn connect() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect to test database")
}

fn service(db: PgPool) -> BookingService {
    let config = AppConfig {
        database_url: String::new(),
        jwt_secret: "test".to_string(),
        stripe_secret_key: String::new(),
        stripe_webhook_secret: String::new(),
        frontend_url: "http://localhost:3000".to_string(),
        email_api_url: String::new(),
        email_api_key: String::new(),
        email_from: String::new(),
        storage_url: String::new(),
        storage_api_key: String::new(),
        port: 0,
    };
    BookingService::new(db, BlobStorage::new(&config))
}

/// Inserts a doctor and a patient with unique emails; returns their user ids.
async fn seed_accounts(db: &PgPool) -> (Uuid, Uuid) {
    let doctor_user: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, role) VALUES ($1, 'x', 'DOCTOR') RETURNING id",
    )
    .bind(format!("doc-{}@test.local", Uuid::new_v4()))
    .fetch_one(db)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO doctor_profiles (user_id, name, specialization, registration_number, fees) \
         VALUES ($1, 'Test Doctor', 'General', $2, 5000)",
    )
    .bind(doctor_user)
    .bind(format!("REG-{}", Uuid::new_v4()))
    .execute(db)
    .await
    .unwrap();

    let patient_user: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, role) VALUES ($1, 'x', 'PATIENT') RETURNING id",
    )
    .bind(format!("pat-{}@test.local", Uuid::new_v4()))
    .fetch_one(db)
    .await
    .unwrap();

    sqlx::query("INSERT INTO patient_profiles (user_id, name) VALUES ($1, 'Test Patient')")
        .bind(patient_user)
        .execute(db)
        .await
        .unwrap();

    (doctor_user, patient_user)
}

fn request(doctor_user_id: Uuid, date: NaiveDate, time_slot: &str) -> BookAppointmentRequest {
    BookAppointmentRequest {
        doctor_user_id,
        date,
        time_slot: time_slot.to_string(),
        reason: None,
        symptoms: None,
        report_base64: None,
        report_content_type: None,
    }
}

#[tokio::test]
#[ignore]
async fn second_booking_of_same_slot_conflicts() {
    let db = connect().await;
    let (doctor_user, patient_user) = seed_accounts(&db).await;
    let date = NaiveDate::from_ymd_opt(2031, 5, 12).unwrap();

    let service = service(db.clone());
    let first = service
        .create_appointment(patient_user, request(doctor_user, date, "09:00"))
        .await
        .unwrap();
    assert_eq!(first.status, AppointmentStatus::Pending);

    let second = service
        .create_appointment(patient_user, request(doctor_user, date, "09:00"))
        .await;
    assert!(matches!(second, Err(BookingError::SlotAlreadyBooked)));
}

#[tokio::test]
#[ignore]
async fn concurrent_bookings_admit_exactly_one() {
    let db = connect().await;
    let (doctor_user, patient_user) = seed_accounts(&db).await;
    let date = NaiveDate::from_ymd_opt(2031, 5, 13).unwrap();

    let a = service(db.clone());
    let b = service(db.clone());
    let (left, right) = tokio::join!(
        a.create_appointment(patient_user, request(doctor_user, date, "10:00")),
        b.create_appointment(patient_user, request(doctor_user, date, "10:00")),
    );

    let wins = [&left, &right].iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);

    let loser = if left.is_err() { left } else { right };
    assert!(matches!(loser, Err(BookingError::SlotAlreadyBooked)));
}

#[tokio::test]
#[ignore]
async fn rejected_appointment_slot_is_reclaimed() {
    let db = connect().await;
    let (doctor_user, patient_user) = seed_accounts(&db).await;
    let date = NaiveDate::from_ymd_opt(2031, 5, 14).unwrap();

    let service = service(db.clone());
    let first = service
        .create_appointment(patient_user, request(doctor_user, date, "11:00"))
        .await
        .unwrap();

    sqlx::query("UPDATE appointments SET status = 'REJECTED' WHERE id = $1")
        .bind(first.id)
        .execute(&db)
        .await
        .unwrap();

    let rebooked = service
        .create_appointment(patient_user, request(doctor_user, date, "11:00"))
        .await
        .unwrap();

    // Same row, back to PENDING for the new booking.
    assert_eq!(rebooked.id, first.id);
    assert_eq!(rebooked.status, AppointmentStatus::Pending);
}
