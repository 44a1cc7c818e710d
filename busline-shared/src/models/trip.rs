use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named point on a trip's route with its cumulative fare from the origin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stop {
    pub name: String,
    pub fare: u64,
}

impl Stop {
    pub fn new(name: impl Into<String>, fare: u64) -> Self {
        Self {
            name: name.into(),
            fare,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Amenities {
    pub has_ac: bool,
    pub has_wifi: bool,
}

/// A scheduled bus run. Always holds at least two stops and never more
/// available seats than total seats; the API boundary enforces both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trip {
    pub id: String,
    pub bus_name: String,
    pub bus_number: String,
    pub name: Option<String>,
    pub stops: Vec<Stop>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub total_seats: u32,
    pub seats_available: u32,
    pub base_fare: Option<u64>,
    pub is_active: bool,
    pub booked_seats: BTreeSet<u32>,
    pub amenities: Amenities,
}

impl Trip {
    pub fn origin(&self) -> &Stop {
        &self.stops[0]
    }

    pub fn destination(&self) -> &Stop {
        &self.stops[self.stops.len() - 1]
    }

    /// Intermediate stops, excluding origin and destination
    pub fn via(&self) -> &[Stop] {
        &self.stops[1..self.stops.len() - 1]
    }

    /// Position of a stop by name (trimmed, case-insensitive)
    pub fn stop_index(&self, name: &str) -> Option<usize> {
        let needle = name.trim().to_lowercase();
        self.stops
            .iter()
            .position(|s| s.name.trim().to_lowercase() == needle)
    }

    /// Whether cumulative fares never decrease along the route
    pub fn fares_monotonic(&self) -> bool {
        self.stops.windows(2).all(|w| w[0].fare <= w[1].fare)
    }

    pub fn is_sold_out(&self) -> bool {
        self.seats_available == 0
    }

    /// Bookable means active with at least one seat left
    pub fn is_bookable(&self) -> bool {
        self.is_active && !self.is_sold_out()
    }

    pub fn has_departed(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now
    }

    /// Scheduled running time; zero if the timetable is inverted
    pub fn duration(&self) -> Duration {
        (self.ends_at - self.starts_at).max(Duration::zero())
    }
}
