pub mod checkout;
pub mod manager;
pub mod models;
pub mod views;

pub use checkout::{BookingGateway, Checkout, CheckoutError, CheckoutOutcome, PendingCheckout};
pub use manager::{BookingError, BookingLedger};
pub use models::{BookingHandle, BookingRequest, BookingState, TrackedBooking};
