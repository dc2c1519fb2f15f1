pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{ScheduleError, WeeklySchedule};
pub use services::schedule::ScheduleService;
pub use services::slots::{day_of_week, generate_slots, SlotService};
