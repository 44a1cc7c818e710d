use busline_shared::Trip;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every route has an origin and a destination
pub const MIN_STOPS: usize = 2;

/// Admin form for a new trip
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripDraft {
    pub bus_name: String,
    pub bus_number: String,
    pub name: String,
    pub stop_names: Vec<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub seats_available: u32,
    pub is_active: bool,
}

impl TripDraft {
    pub fn new(default_seats: u32) -> Self {
        Self {
            bus_name: String::new(),
            bus_number: String::new(),
            name: String::new(),
            stop_names: Vec::new(),
            starts_at: None,
            ends_at: None,
            seats_available: default_seats,
            is_active: true,
        }
    }

    /// Append a stop; blank names are refused
    pub fn add_stop(&mut self, name: &str) -> Result<(), FleetError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FleetError::BlankStop(self.stop_names.len()));
        }
        self.stop_names.push(name.to_string());
        Ok(())
    }

    pub fn remove_stop(&mut self, index: usize) -> Result<String, FleetError> {
        remove_at(&mut self.stop_names, index)
    }

    pub fn validate(&self) -> Result<(), FleetError> {
        validate_identity(&self.bus_name, &self.bus_number)?;
        validate_stops(self.stop_names.iter().map(String::as_str))?;
        validate_schedule(self.starts_at, self.ends_at)?;
        if self.seats_available == 0 {
            return Err(FleetError::InvalidSeatCount);
        }
        Ok(())
    }
}

/// A stop in an update form; fares already on the server are carried through
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StopDraft {
    pub name: String,
    pub fare: Option<u64>,
}

/// Admin form for editing an existing trip
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripUpdate {
    pub id: String,
    pub bus_name: String,
    pub bus_number: String,
    pub name: String,
    pub stops: Vec<StopDraft>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub seats_available: u32,
    pub is_active: bool,
}

impl TripUpdate {
    /// Prefill the form from the current trip
    pub fn from_trip(trip: &Trip) -> Self {
        Self {
            id: trip.id.clone(),
            bus_name: trip.bus_name.clone(),
            bus_number: trip.bus_number.clone(),
            name: trip.name.clone().unwrap_or_default(),
            stops: trip
                .stops
                .iter()
                .map(|s| StopDraft {
                    name: s.name.clone(),
                    fare: Some(s.fare),
                })
                .collect(),
            starts_at: Some(trip.starts_at),
            ends_at: Some(trip.ends_at),
            seats_available: trip.seats_available,
            is_active: trip.is_active,
        }
    }

    pub fn add_stop(&mut self, name: &str) -> Result<(), FleetError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FleetError::BlankStop(self.stops.len()));
        }
        self.stops.push(StopDraft {
            name: name.to_string(),
            fare: None,
        });
        Ok(())
    }

    pub fn remove_stop(&mut self, index: usize) -> Result<String, FleetError> {
        remove_at(&mut self.stops, index).map(|s| s.name)
    }

    /// Remove stops by 1-based position, as listed before any removal.
    /// A position given twice is removed once.
    pub fn remove_positions(&mut self, positions: &[usize]) -> Result<Vec<String>, FleetError> {
        let mut indices = positions
            .iter()
            .map(|&p| p.checked_sub(1).ok_or(FleetError::InvalidPosition(p)))
            .collect::<Result<Vec<_>, _>>()?;
        // Highest first so earlier removals don't shift later ones
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();
        indices.into_iter().map(|i| self.remove_stop(i)).collect()
    }

    pub fn validate(&self) -> Result<(), FleetError> {
        validate_identity(&self.bus_name, &self.bus_number)?;
        validate_stops(self.stops.iter().map(|s| s.name.as_str()))?;
        validate_schedule(self.starts_at, self.ends_at)?;
        if self.seats_available == 0 {
            return Err(FleetError::InvalidSeatCount);
        }
        Ok(())
    }
}

fn remove_at<T>(items: &mut Vec<T>, index: usize) -> Result<T, FleetError> {
    if index >= items.len() {
        return Err(FleetError::NoSuchStop(index));
    }
    if items.len() <= MIN_STOPS {
        return Err(FleetError::TooFewStops {
            min: MIN_STOPS,
            found: items.len() - 1,
        });
    }
    Ok(items.remove(index))
}

fn validate_identity(bus_name: &str, bus_number: &str) -> Result<(), FleetError> {
    if bus_name.trim().is_empty() {
        return Err(FleetError::MissingField("bus name"));
    }
    if bus_number.trim().is_empty() {
        return Err(FleetError::MissingField("bus number"));
    }
    Ok(())
}

fn validate_stops<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), FleetError> {
    let mut count = 0;
    for (i, name) in names.enumerate() {
        if name.trim().is_empty() {
            return Err(FleetError::BlankStop(i));
        }
        count += 1;
    }
    if count < MIN_STOPS {
        return Err(FleetError::TooFewStops {
            min: MIN_STOPS,
            found: count,
        });
    }
    Ok(())
}

fn validate_schedule(
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<(), FleetError> {
    let start = starts_at.ok_or(FleetError::MissingField("departure time"))?;
    let end = ends_at.ok_or(FleetError::MissingField("arrival time"))?;
    if end <= start {
        return Err(FleetError::InvalidSchedule);
    }
    Ok(())
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FleetError {
    #[error("Missing {0}")]
    MissingField(&'static str),

    #[error("Stop {} has no name", .0 + 1)]
    BlankStop(usize),

    #[error("A route needs at least {min} stops, got {found}")]
    TooFewStops {
        min: usize,
        found: usize,
    },

    #[error("No stop at position {}", .0 + 1)]
    NoSuchStop(usize),

    #[error("Stop positions start at 1, got {0}")]
    InvalidPosition(usize),

    #[error("Arrival must be after departure")]
    InvalidSchedule,

    #[error("Seat count must be positive")]
    InvalidSeatCount,
}

#[cfg(test)]
mod tests {
    use super::*;
    use busline_shared::{Amenities, Stop};
    use chrono::{Duration, TimeZone};

    fn filled_draft() -> TripDraft {
        let start = Utc.with_ymd_and_hms(2026, 12, 24, 22, 0, 0).unwrap();
        let mut draft = TripDraft::new(40);
        draft.bus_name = "Night Rider".to_string();
        draft.bus_number = "TN09BX7777".to_string();
        draft.add_stop("Chennai").unwrap();
        draft.add_stop(" Vellore ").unwrap();
        draft.add_stop("Bengaluru").unwrap();
        draft.starts_at = Some(start);
        draft.ends_at = Some(start + Duration::hours(7));
        draft
    }

    #[test]
    fn test_valid_draft() {
        let draft = filled_draft();
        assert!(draft.validate().is_ok());
        assert_eq!(draft.stop_names[1], "Vellore");
        assert_eq!(draft.seats_available, 40);
    }

    #[test]
    fn test_draft_rejections() {
        let mut draft = filled_draft();
        draft.bus_number = "  ".to_string();
        assert_eq!(draft.validate(), Err(FleetError::MissingField("bus number")));

        let mut draft = filled_draft();
        draft.ends_at = draft.starts_at;
        assert_eq!(draft.validate(), Err(FleetError::InvalidSchedule));

        let mut draft = filled_draft();
        draft.seats_available = 0;
        assert_eq!(draft.validate(), Err(FleetError::InvalidSeatCount));

        let mut draft = filled_draft();
        draft.stop_names.truncate(1);
        assert_eq!(
            draft.validate(),
            Err(FleetError::TooFewStops { min: 2, found: 1 })
        );

        let mut draft = filled_draft();
        assert_eq!(draft.add_stop("   "), Err(FleetError::BlankStop(3)));
    }

    #[test]
    fn test_remove_stop_keeps_two() {
        let mut draft = filled_draft();
        assert_eq!(draft.remove_stop(1), Ok("Vellore".to_string()));
        assert_eq!(
            draft.remove_stop(0),
            Err(FleetError::TooFewStops { min: 2, found: 1 })
        );
        assert_eq!(draft.remove_stop(5), Err(FleetError::NoSuchStop(5)));
    }

    #[test]
    fn test_update_prefill_keeps_fares() {
        let now = Utc::now();
        let trip = Trip {
            id: "bus-9".to_string(),
            bus_name: "Hill Climber".to_string(),
            bus_number: "KL07C1111".to_string(),
            name: Some("KSRTC".to_string()),
            stops: vec![Stop::new("Kochi", 0), Stop::new("Munnar", 350)],
            starts_at: now,
            ends_at: now + Duration::hours(4),
            total_seats: 36,
            seats_available: 10,
            base_fare: None,
            is_active: false,
            booked_seats: Default::default(),
            amenities: Amenities::default(),
        };

        let mut update = TripUpdate::from_trip(&trip);
        assert_eq!(update.name, "KSRTC");
        assert_eq!(update.stops[1].fare, Some(350));
        assert!(update.validate().is_ok());

        update.seats_available = 0;
        assert_eq!(update.validate(), Err(FleetError::InvalidSeatCount));
        update.seats_available = 10;

        update.add_stop("Thekkady").unwrap();
        assert_eq!(update.stops[2].fare, None);
        assert_eq!(update.remove_stop(0), Ok("Kochi".to_string()));
        assert!(update.remove_stop(0).is_err());
    }

    #[test]
    fn test_remove_positions_once_each() {
        let now = Utc::now();
        let trip = Trip {
            id: "bus-4".to_string(),
            bus_name: "Coast Line".to_string(),
            bus_number: "KA20D4444".to_string(),
            name: None,
            stops: vec![
                Stop::new("Udupi", 0),
                Stop::new("Kundapura", 80),
                Stop::new("Bhatkal", 160),
                Stop::new("Honnavar", 220),
                Stop::new("Karwar", 300),
            ],
            starts_at: now,
            ends_at: now + Duration::hours(5),
            total_seats: 40,
            seats_available: 40,
            base_fare: None,
            is_active: true,
            booked_seats: Default::default(),
            amenities: Amenities::default(),
        };

        let mut update = TripUpdate::from_trip(&trip);
        let removed = update.remove_positions(&[2, 4, 2]).unwrap();
        assert_eq!(removed, vec!["Honnavar".to_string(), "Kundapura".to_string()]);
        let names: Vec<_> = update.stops.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Udupi", "Bhatkal", "Karwar"]);

        assert_eq!(
            update.remove_positions(&[0]),
            Err(FleetError::InvalidPosition(0))
        );
        assert_eq!(update.stops.len(), 3);
    }
}
