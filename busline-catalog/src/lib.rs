pub mod fare;
pub mod fleet;
pub mod seats;

pub use fare::{FareConfig, FareEngine, FareError, FarePolicy, FareQuote, SeatSelection};
pub use fleet::{FleetError, StopDraft, TripDraft, TripUpdate};
pub use seats::{SeatMap, SeatState};
