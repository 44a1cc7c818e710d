use busline_shared::Trip;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::fare::FareError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    Available,
    Booked,
    Selected,
}

/// Seat layout of one trip plus the rider's current selection
#[derive(Debug, Clone)]
pub struct SeatMap {
    total_seats: u32,
    seats_available: u32,
    booked: BTreeSet<u32>,
    /// In the order the rider picked them
    selected: Vec<u32>,
}

impl SeatMap {
    pub fn for_trip(trip: &Trip) -> Self {
        Self {
            total_seats: trip.total_seats,
            seats_available: trip.seats_available,
            booked: trip.booked_seats.clone(),
            selected: Vec::new(),
        }
    }

    /// `None` for seat numbers outside `1..=total_seats`
    pub fn state(&self, seat: u32) -> Option<SeatState> {
        if seat == 0 || seat > self.total_seats {
            None
        } else if self.booked.contains(&seat) {
            Some(SeatState::Booked)
        } else if self.selected.contains(&seat) {
            Some(SeatState::Selected)
        } else {
            Some(SeatState::Available)
        }
    }

    /// Select an available seat or release a selected one; returns the new state
    pub fn toggle(&mut self, seat: u32) -> Result<SeatState, FareError> {
        match self.state(seat) {
            None => Err(FareError::SeatOutOfRange {
                seat,
                total: self.total_seats,
            }),
            Some(SeatState::Booked) => Err(FareError::SeatTaken(seat)),
            Some(SeatState::Selected) => {
                self.selected.retain(|s| *s != seat);
                Ok(SeatState::Available)
            }
            Some(SeatState::Available) => {
                let requested = self.selected.len() as u32 + 1;
                if requested > self.seats_available {
                    return Err(FareError::InsufficientSeats {
                        requested,
                        available: self.seats_available,
                    });
                }
                self.selected.push(seat);
                Ok(SeatState::Selected)
            }
        }
    }

    pub fn selected(&self) -> &[u32] {
        &self.selected
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Seats not booked by anyone, ignoring the current selection
    pub fn open_seats(&self) -> u32 {
        self.total_seats.saturating_sub(self.booked.len() as u32)
    }

    /// Booked share of the bus, `0.0..=1.0`
    pub fn occupancy(&self) -> f64 {
        if self.total_seats == 0 {
            0.0
        } else {
            (self.booked.len() as f64 / self.total_seats as f64).min(1.0)
        }
    }

    /// Seats laid out `per_row` to a row for rendering
    pub fn rows(&self, per_row: usize) -> Vec<Vec<(u32, SeatState)>> {
        let per_row = per_row.max(1);
        let seats: Vec<(u32, SeatState)> = (1..=self.total_seats)
            .filter_map(|n| self.state(n).map(|s| (n, s)))
            .collect();
        seats.chunks(per_row).map(|c| c.to_vec()).collect()
    }
}

/// Remaining share of seats for the trip card's fill bar
pub fn seats_left_ratio(trip: &Trip) -> f64 {
    if trip.total_seats == 0 {
        0.0
    } else {
        (trip.seats_available as f64 / trip.total_seats as f64).clamp(0.0, 1.0)
    }
}
