pub mod fulfillment;
pub mod stripe;
pub mod sweeper;
pub mod webhook;
