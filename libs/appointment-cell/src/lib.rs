pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Appointment, BookingError};
pub use services::lifecycle::validate_status_transition;
