pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::SessionError;
pub use services::session::{SessionService, REFRESH_TOKEN_TTL_DAYS};
