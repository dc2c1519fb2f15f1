//! Fulfillment and sweeper tests against a live Postgres. Run with a
//! migrated database:
//!
//!     DATABASE_URL=postgres://... cargo test -p payment-cell -- --ignored

use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use payment_cell::services::fulfillment::FulfillmentService;
use payment_cell::ExpirySweeper;
use shared_models::status::{AppointmentStatus, PaymentStatus};

async fn connect() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect to test database")
}

/// Seeds a doctor, a patient and one appointment in the given status;
/// returns the appointment id. Each call uses a fresh doctor, so slots
/// never collide across tests.
async fn seed_appointment(db: &PgPool, status: AppointmentStatus) -> Uuid {
    let doctor_user: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, role) VALUES ($1, 'x', 'DOCTOR') RETURNING id",
    )
    .bind(format!("doc-{}@test.local", Uuid::new_v4()))
    .fetch_one(db)
    .await
    .unwrap();

    let doctor_id: Uuid = sqlx::query_scalar(
        "INSERT INTO doctor_profiles (user_id, name, specialization, registration_number, fees) \
         VALUES ($1, 'Test Doctor', 'General', $2, 5000) RETURNING id",
    )
    .bind(doctor_user)
    .bind(format!("REG-{}", Uuid::new_v4()))
    .fetch_one(db)
    .await
    .unwrap();

    let patient_user: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, role) VALUES ($1, 'x', 'PATIENT') RETURNING id",
    )
    .bind(format!("pat-{}@test.local", Uuid::new_v4()))
    .fetch_one(db)
    .await
    .unwrap();

    let patient_id: Uuid = sqlx::query_scalar(
        "INSERT INTO patient_profiles (user_id, name) VALUES ($1, 'Test Patient') RETURNING id",
    )
    .bind(patient_user)
    .fetch_one(db)
    .await
    .unwrap();

    sqlx::query_scalar(
        "INSERT INTO appointments (doctor_id, patient_id, date, time_slot, status) \
         VALUES ($1, $2, '2031-06-01', '09:00', $3) RETURNING id",
    )
    .bind(doctor_id)
    .bind(patient_id)
    .bind(status)
    .fetch_one(db)
    .await
    .unwrap()
}

async fn seed_payment(
    db: &PgPool,
    appointment_id: Uuid,
    status: PaymentStatus,
    expires_in_secs: i64,
) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO payments (appointment_id, amount, stripe_session_id, status, expires_at) \
         VALUES ($1, 5000, $2, $3, $4) RETURNING id",
    )
    .bind(appointment_id)
    .bind(format!("cs_test_{}", Uuid::new_v4()))
    .bind(status)
    .bind(Utc::now() + Duration::seconds(expires_in_secs))
    .fetch_one(db)
    .await
    .unwrap()
}

async fn statuses(db: &PgPool, appointment_id: Uuid) -> (AppointmentStatus, PaymentStatus) {
    sqlx::query_as(
        "SELECT a.status, p.status FROM appointments a \
         JOIN payments p ON p.appointment_id = a.id \
         WHERE a.id = $1",
    )
    .bind(appointment_id)
    .fetch_one(db)
    .await
    .unwrap()
}

#[tokio::test]
#[ignore]
async fn sweep_rejects_only_expired_pending_payments() {
    let db = connect().await;

    let lapsed = seed_appointment(&db, AppointmentStatus::ApprovedUnpaid).await;
    seed_payment(&db, lapsed, PaymentStatus::Pending, -3600).await;

    let still_open = seed_appointment(&db, AppointmentStatus::ApprovedUnpaid).await;
    seed_payment(&db, still_open, PaymentStatus::Pending, 3600).await;

    let already_paid = seed_appointment(&db, AppointmentStatus::Paid).await;
    seed_payment(&db, already_paid, PaymentStatus::Succeeded, -3600).await;

    let swept = ExpirySweeper::new(db.clone()).run_cleanup().await.unwrap();
    assert!(swept >= 1);

    assert_eq!(
        statuses(&db, lapsed).await,
        (AppointmentStatus::Rejected, PaymentStatus::Failed)
    );
    assert_eq!(
        statuses(&db, still_open).await,
        (AppointmentStatus::ApprovedUnpaid, PaymentStatus::Pending)
    );
    // An already-settled payment is never reopened by the sweep, even with a
    // stale deadline on the row.
    assert_eq!(
        statuses(&db, already_paid).await,
        (AppointmentStatus::Paid, PaymentStatus::Succeeded)
    );
}

#[tokio::test]
#[ignore]
async fn completed_session_overturns_a_swept_rejection() {
    let db = connect().await;

    let appointment = seed_appointment(&db, AppointmentStatus::Rejected).await;
    seed_payment(&db, appointment, PaymentStatus::Failed, -3600).await;
    let session_id: String =
        sqlx::query_scalar("SELECT stripe_session_id FROM payments WHERE appointment_id = $1")
            .bind(appointment)
            .fetch_one(&db)
            .await
            .unwrap();

    FulfillmentService::new(db.clone())
        .fulfill(&session_id, appointment)
        .await
        .unwrap();

    // The charge was captured, so the payment outcome wins over the
    // provisional rejection.
    assert_eq!(
        statuses(&db, appointment).await,
        (AppointmentStatus::Paid, PaymentStatus::Succeeded)
    );
}

#[tokio::test]
#[ignore]
async fn fulfill_replay_is_a_noop() {
    let db = connect().await;

    let appointment = seed_appointment(&db, AppointmentStatus::ApprovedUnpaid).await;
    seed_payment(&db, appointment, PaymentStatus::Pending, 3600).await;
    let session_id: String =
        sqlx::query_scalar("SELECT stripe_session_id FROM payments WHERE appointment_id = $1")
            .bind(appointment)
            .fetch_one(&db)
            .await
            .unwrap();

    let service = FulfillmentService::new(db.clone());
    service.fulfill(&session_id, appointment).await.unwrap();
    let first_paid_at: Option<chrono::DateTime<Utc>> =
        sqlx::query_scalar("SELECT paid_at FROM payments WHERE appointment_id = $1")
            .bind(appointment)
            .fetch_one(&db)
            .await
            .unwrap();
    assert!(first_paid_at.is_some());

    service.fulfill(&session_id, appointment).await.unwrap();

    let second_paid_at: Option<chrono::DateTime<Utc>> =
        sqlx::query_scalar("SELECT paid_at FROM payments WHERE appointment_id = $1")
            .bind(appointment)
            .fetch_one(&db)
            .await
            .unwrap();
    assert_eq!(first_paid_at, second_paid_at);
    assert_eq!(
        statuses(&db, appointment).await,
        (AppointmentStatus::Paid, PaymentStatus::Succeeded)
    );
}
