pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{CheckoutSession, Payment, PaymentError};
pub use services::stripe::{StripeClient, PAYMENT_WINDOW_SECS};
pub use services::sweeper::ExpirySweeper;
