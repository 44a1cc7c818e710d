use busline_shared::Trip;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a segment fare is derived from the trip's stops
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum FarePolicy {
    /// Absolute difference of the two stops' cumulative fares
    #[default]
    StopDifference,
    /// Same amount per seat whatever the segment
    FlatPerSeat(u64),
    /// Fixed amount per stop-to-stop hop
    PerSegment(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FareConfig {
    /// Policy for origin/destination quotes
    pub policy: FarePolicy,

    /// Per-seat fare for numbered-seat bookings when the trip has no base fare
    pub default_seat_fare: u64,
}

impl Default for FareConfig {
    fn default() -> Self {
        Self {
            policy: FarePolicy::StopDifference,
            default_seat_fare: 300,
        }
    }
}

/// What the rider is asking for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatSelection {
    /// A count of seats between two named stops
    Segment {
        origin: String,
        destination: String,
        seats: u32,
    },
    /// Specific seat numbers over the whole route
    Numbered(Vec<u32>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareQuote {
    pub per_seat: u64,
    pub seat_count: u32,
    pub total: u64,
    pub from: String,
    pub to: String,
    /// Seat numbers, empty for segment quotes
    pub seats: Vec<u32>,
}

/// Fare and seat validation over a trip
pub struct FareEngine {
    config: FareConfig,
}

impl FareEngine {
    pub fn new(config: FareConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FareConfig {
        &self.config
    }

    /// Resolve origin and destination to stop indices, origin strictly first
    pub fn segment_indices(
        trip: &Trip,
        origin: &str,
        destination: &str,
    ) -> Result<(usize, usize), FareError> {
        let from = trip
            .stop_index(origin)
            .ok_or_else(|| FareError::UnknownStop(origin.trim().to_string()))?;
        let to = trip
            .stop_index(destination)
            .ok_or_else(|| FareError::UnknownStop(destination.trim().to_string()))?;

        if from == to {
            return Err(FareError::SameStop(trip.stops[from].name.clone()));
        }
        if to < from {
            return Err(FareError::ReversedStops {
                origin: trip.stops[from].name.clone(),
                destination: trip.stops[to].name.clone(),
            });
        }

        Ok((from, to))
    }

    /// Per-seat fare between two already-validated stop indices
    pub fn segment_fare(&self, trip: &Trip, from: usize, to: usize) -> u64 {
        match self.config.policy {
            FarePolicy::StopDifference => trip.stops[to].fare.abs_diff(trip.stops[from].fare),
            FarePolicy::FlatPerSeat(amount) => amount,
            FarePolicy::PerSegment(amount) => amount.saturating_mul(to.abs_diff(from) as u64),
        }
    }

    /// Quote `seats` seats from `origin` to `destination`
    pub fn quote_segment(
        &self,
        trip: &Trip,
        origin: &str,
        destination: &str,
        seats: u32,
    ) -> Result<FareQuote, FareError> {
        let (from, to) = Self::segment_indices(trip, origin, destination)?;
        check_bookable(trip)?;
        check_capacity(trip, seats)?;

        if !trip.fares_monotonic() {
            tracing::warn!(
                trip_id = %trip.id,
                "Stop fares decrease along the route; quoting absolute difference"
            );
        }

        let per_seat = self.segment_fare(trip, from, to);
        let total = per_seat
            .checked_mul(seats as u64)
            .ok_or(FareError::Overflow)?;

        Ok(FareQuote {
            per_seat,
            seat_count: seats,
            total,
            from: trip.stops[from].name.clone(),
            to: trip.stops[to].name.clone(),
            seats: Vec::new(),
        })
    }

    /// Quote specific seat numbers over the whole route.
    ///
    /// Each seat must exist, appear once, and not already be booked.
    pub fn quote_seats(&self, trip: &Trip, seats: &[u32]) -> Result<FareQuote, FareError> {
        check_bookable(trip)?;

        let mut seen = BTreeSet::new();
        for &seat in seats {
            if seat == 0 || seat > trip.total_seats {
                return Err(FareError::SeatOutOfRange {
                    seat,
                    total: trip.total_seats,
                });
            }
            if !seen.insert(seat) {
                return Err(FareError::DuplicateSeat(seat));
            }
            if trip.booked_seats.contains(&seat) {
                return Err(FareError::SeatTaken(seat));
            }
        }

        let count = u32::try_from(seats.len()).map_err(|_| FareError::Overflow)?;
        check_capacity(trip, count)?;

        let per_seat = trip.base_fare.unwrap_or(self.config.default_seat_fare);
        let total = per_seat
            .checked_mul(count as u64)
            .ok_or(FareError::Overflow)?;

        Ok(FareQuote {
            per_seat,
            seat_count: count,
            total,
            from: trip.origin().name.clone(),
            to: trip.destination().name.clone(),
            seats: seats.to_vec(),
        })
    }

    pub fn quote(&self, trip: &Trip, selection: &SeatSelection) -> Result<FareQuote, FareError> {
        match selection {
            SeatSelection::Segment {
                origin,
                destination,
                seats,
            } => self.quote_segment(trip, origin, destination, *seats),
            SeatSelection::Numbered(seats) => self.quote_seats(trip, seats),
        }
    }
}

impl Default for FareEngine {
    fn default() -> Self {
        Self::new(FareConfig::default())
    }
}

fn check_bookable(trip: &Trip) -> Result<(), FareError> {
    if !trip.is_active {
        return Err(FareError::TripInactive(trip.id.clone()));
    }
    Ok(())
}

fn check_capacity(trip: &Trip, requested: u32) -> Result<(), FareError> {
    if requested == 0 {
        return Err(FareError::InvalidSeatCount);
    }
    if requested > trip.seats_available {
        return Err(FareError::InsufficientSeats {
            requested,
            available: trip.seats_available,
        });
    }
    Ok(())
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FareError {
    #[error("Stop not on this route: {0}")]
    UnknownStop(String),

    #[error("Origin and destination are the same stop: {0}")]
    SameStop(String),

    #[error("Destination {destination} comes before origin {origin}")]
    ReversedStops {
        origin: String,
        destination: String,
    },

    #[error("Select at least one seat")]
    InvalidSeatCount,

    #[error("Insufficient seats: requested {requested}, available {available}")]
    InsufficientSeats {
        requested: u32,
        available: u32,
    },

    #[error("Seat {0} is already booked")]
    SeatTaken(u32),

    #[error("Seat {seat} does not exist (bus has {total} seats)")]
    SeatOutOfRange {
        seat: u32,
        total: u32,
    },

    #[error("Seat {0} selected more than once")]
    DuplicateSeat(u32),

    #[error("Trip is not active: {0}")]
    TripInactive(String),

    #[error("Fare total out of range")]
    Overflow,
}

impl FareError {
    /// Seat-count and availability failures
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            FareError::InvalidSeatCount | FareError::InsufficientSeats { .. }
        )
    }

    /// A requested seat is held by someone else
    pub fn is_conflict(&self) -> bool {
        matches!(self, FareError::SeatTaken(_))
    }
}
