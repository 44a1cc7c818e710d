pub mod booking;
pub mod stats;
pub mod trip;
pub mod user;

pub use booking::{Booking, BookingStatus, PaymentMethod, PaymentStatus, TripSummary, UserSummary};
pub use stats::{AdminStats, BusPerformance, MonthlyRevenue, RouteStat, StatsSummary};
pub use trip::{Amenities, Stop, Trip};
pub use user::{Role, User};
