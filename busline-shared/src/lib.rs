pub mod models;
pub mod pii;

pub use models::{
    AdminStats, Amenities, Booking, BookingStatus, PaymentMethod, PaymentStatus, Role, Stop, Trip,
    TripSummary, User, UserSummary,
};
pub use pii::Masked;
