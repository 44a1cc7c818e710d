//! JSON shapes the booking server speaks, and their conversion into
//! validated models.
//!
//! Payloads are loosely typed: fares may be numbers, numeric strings or
//! missing, references may be populated objects or bare ids, and the
//! booking status shows up under either `status` or `Status`. Everything
//! is normalized here so the rest of the workspace never sees it.

use busline_catalog::{SeatSelection, TripDraft, TripUpdate};
use busline_core::identity::{Credentials, Registration};
use busline_order::BookingRequest;
use busline_shared::{
    AdminStats, Amenities, Booking, BookingStatus, PaymentMethod, PaymentStatus, Role, Stop, Trip,
    TripSummary, User, UserSummary,
};
use busline_shared::models::{BusPerformance, MonthlyRevenue, RouteStat, StatsSummary};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Seat count assumed when the server leaves `totalSeats` out
pub const DEFAULT_TOTAL_SEATS: u32 = 40;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Trip {id} has {found} stops, at least 2 required")]
    TooFewStops { id: String, found: usize },

    #[error("Trip {id} has {available} seats available out of {total}")]
    SeatsExceedTotal {
        id: String,
        available: u32,
        total: u32,
    },

    #[error("Negative amount in {field}: {value}")]
    NegativeAmount { field: &'static str, value: String },

    #[error("Unrecognized {field}: {value}")]
    UnknownValue { field: &'static str, value: String },

    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Read a money amount. Missing and non-numeric values count as zero;
/// negative values are refused.
pub fn parse_amount(value: &Value, field: &'static str) -> Result<u64, WireError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if !n.is_finite() => Ok(0),
        Some(n) if n < 0.0 => Err(WireError::NegativeAmount {
            field,
            value: value.to_string(),
        }),
        Some(n) => Ok(n.round() as u64),
        None => Ok(0),
    }
}

/// Read a seat count or seat number. Numbers and numeric strings are
/// accepted; missing means `None`.
pub fn parse_count(value: &Value, field: &'static str) -> Result<Option<u32>, WireError> {
    let number = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() && n >= 0.0 && n <= f64::from(u32::MAX) => {
            Ok(Some(n.round() as u32))
        }
        _ => Err(WireError::UnknownValue {
            field,
            value: value.to_string(),
        }),
    }
}

/// Seat numbers from an array; entries that are not seat numbers are dropped
fn parse_seat_list(value: &Value) -> Vec<u32> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| parse_count(v, "seats").ok().flatten())
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_payment_method(value: Option<&str>) -> Result<PaymentMethod, WireError> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("online") => Ok(PaymentMethod::Online),
        Some("cash") => Ok(PaymentMethod::Cash),
        Some(other) => Err(WireError::UnknownValue {
            field: "paymentMethod",
            value: other.to_string(),
        }),
    }
}

fn parse_payment_status(
    value: Option<&str>,
    method: PaymentMethod,
) -> Result<PaymentStatus, WireError> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("pending") => Ok(PaymentStatus::Pending),
        Some("completed") | Some("paid") => Ok(PaymentStatus::Completed),
        None | Some("") if method.is_deferred() => Ok(PaymentStatus::Pending),
        None | Some("") => Ok(PaymentStatus::Completed),
        Some(other) => Err(WireError::UnknownValue {
            field: "paymentStatus",
            value: other.to_string(),
        }),
    }
}

fn parse_booking_status(value: Option<&str>) -> BookingStatus {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("cancelled") | Some("canceled") => BookingStatus::Cancelled,
        _ => BookingStatus::Confirmed,
    }
}

fn parse_role(value: Option<&str>) -> Role {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("admin") => Role::Admin,
        _ => Role::Rider,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ---- trips ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStop {
    #[serde(default)]
    pub name: Option<String>,
    /// Cumulative fare from the first stop
    #[serde(default)]
    pub fare_from_start: Value,
    /// Older payloads carry the same amount as `fare`
    #[serde(default)]
    pub fare: Value,
}

impl RawStop {
    fn cumulative_fare(&self) -> Result<u64, WireError> {
        if self.fare_from_start.is_null() {
            parse_amount(&self.fare, "stops.fare")
        } else {
            parse_amount(&self.fare_from_start, "stops.fareFromStart")
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrip {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub bus_name: Option<String>,
    #[serde(default)]
    pub bus_number: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub stops: Vec<RawStop>,
    #[serde(default)]
    pub start_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub seats_available: Value,
    #[serde(default)]
    pub total_seats: Value,
    #[serde(default)]
    pub fare: Value,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub booked_seats: Value,
    #[serde(default, rename = "hasAC")]
    pub has_ac: bool,
    #[serde(default)]
    pub has_wifi: bool,
}

impl TryFrom<RawTrip> for Trip {
    type Error = WireError;

    fn try_from(raw: RawTrip) -> Result<Self, Self::Error> {
        if raw.stops.len() < 2 {
            return Err(WireError::TooFewStops {
                id: raw.id,
                found: raw.stops.len(),
            });
        }

        let mut stops = Vec::with_capacity(raw.stops.len());
        for stop in &raw.stops {
            let name = non_blank(stop.name.clone()).ok_or(WireError::MissingField("stops.name"))?;
            stops.push(Stop::new(name, stop.cumulative_fare()?));
        }

        let starts_at = raw
            .start_date_time
            .ok_or(WireError::MissingField("startDateTime"))?;
        let ends_at = raw
            .end_date_time
            .ok_or(WireError::MissingField("endDateTime"))?;

        let seats_available = parse_count(&raw.seats_available, "seatsAvailable")?.unwrap_or(0);
        let total_seats = parse_count(&raw.total_seats, "totalSeats")?
            .unwrap_or_else(|| DEFAULT_TOTAL_SEATS.max(seats_available));
        if seats_available > total_seats {
            return Err(WireError::SeatsExceedTotal {
                id: raw.id,
                available: seats_available,
                total: total_seats,
            });
        }

        let base_fare = if raw.fare.is_null() {
            None
        } else {
            Some(parse_amount(&raw.fare, "fare")?).filter(|f| *f > 0)
        };

        let trip = Trip {
            id: raw.id,
            bus_name: raw.bus_name.unwrap_or_default(),
            bus_number: raw.bus_number.unwrap_or_default(),
            name: non_blank(raw.name),
            stops,
            starts_at,
            ends_at,
            total_seats,
            seats_available,
            base_fare,
            is_active: raw.is_active.unwrap_or(true),
            booked_seats: parse_seat_list(&raw.booked_seats).into_iter().collect(),
            amenities: Amenities {
                has_ac: raw.has_ac,
                has_wifi: raw.has_wifi,
            },
        };

        if !trip.fares_monotonic() {
            tracing::warn!(trip_id = %trip.id, "Stop fares are not non-decreasing");
        }
        Ok(trip)
    }
}

/// Decode and convert a listing record by record, dropping any record
/// that does not decode or fails validation
fn listing<R, T>(raw: Vec<Value>, kind: &str) -> Vec<T>
where
    R: DeserializeOwned,
    T: TryFrom<R, Error = WireError>,
{
    raw.into_iter()
        .filter_map(|value| {
            let converted = serde_json::from_value::<R>(value)
                .map_err(|e| WireError::Malformed(e.to_string()))
                .and_then(T::try_from);
            match converted {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!("Skipping invalid {}: {}", kind, e);
                    None
                }
            }
        })
        .collect()
}

pub fn trips_from_raw(raw: Vec<Value>) -> Vec<Trip> {
    listing::<RawTrip, Trip>(raw, "trip")
}

// ---- users ----

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        User {
            id: raw.id,
            name: raw.name.unwrap_or_default(),
            email: non_blank(raw.email),
            role: parse_role(raw.role.as_deref()),
        }
    }
}

/// A reference that is either populated or just an id
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRef<T> {
    Populated(T),
    Id(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTripRef {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub bus_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bus_number: Option<String>,
    #[serde(default)]
    pub stops: Vec<RawStop>,
    #[serde(default)]
    pub start_date_time: Option<DateTime<Utc>>,
}

// ---- bookings ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBooking {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub bus: Option<RawRef<RawTripRef>>,
    #[serde(default)]
    pub user: Option<RawRef<RawUser>>,
    #[serde(default)]
    pub seats: Value,
    #[serde(default)]
    pub seats_booked: Value,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub total_fare: Value,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "Status")]
    pub legacy_status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<RawBooking> for Booking {
    type Error = WireError;

    fn try_from(raw: RawBooking) -> Result<Self, Self::Error> {
        let trip_ref = match raw.bus {
            Some(RawRef::Populated(t)) => Some(t),
            Some(RawRef::Id(id)) => Some(RawTripRef {
                id: Some(id),
                bus_name: None,
                name: None,
                bus_number: None,
                stops: Vec::new(),
                start_date_time: None,
            }),
            None => None,
        };

        let stop_name = |t: &RawTripRef, last: bool| {
            let stop = if last { t.stops.last() } else { t.stops.first() };
            stop.and_then(|s| s.name.clone())
        };
        let from = non_blank(raw.from)
            .or_else(|| trip_ref.as_ref().and_then(|t| stop_name(t, false)))
            .unwrap_or_default();
        let to = non_blank(raw.to)
            .or_else(|| trip_ref.as_ref().and_then(|t| stop_name(t, true)))
            .unwrap_or_default();

        let trip = match trip_ref {
            Some(t) => TripSummary {
                id: t.id.unwrap_or_default(),
                bus_name: t.bus_name.or(t.name).unwrap_or_default(),
                bus_number: t.bus_number.unwrap_or_default(),
                from: from.clone(),
                to: to.clone(),
                starts_at: t.start_date_time,
            },
            None => TripSummary {
                id: String::new(),
                bus_name: String::new(),
                bus_number: String::new(),
                from: from.clone(),
                to: to.clone(),
                starts_at: None,
            },
        };

        let user = match raw.user {
            Some(RawRef::Populated(u)) => Some(UserSummary {
                id: u.id,
                name: u.name.unwrap_or_default(),
                email: non_blank(u.email),
            }),
            Some(RawRef::Id(id)) => Some(UserSummary {
                id: Some(id),
                name: String::new(),
                email: None,
            }),
            None => None,
        };

        let mut seats = parse_seat_list(&raw.seats);
        let seat_count = match &raw.seats_booked {
            Value::Array(_) => {
                if seats.is_empty() {
                    seats = parse_seat_list(&raw.seats_booked);
                }
                seats.len() as u32
            }
            other => parse_count(other, "seatsBooked")
                .ok()
                .flatten()
                .unwrap_or(seats.len() as u32),
        };

        let payment_method = parse_payment_method(raw.payment_method.as_deref())?;
        let payment_status = parse_payment_status(raw.payment_status.as_deref(), payment_method)?;
        let status = parse_booking_status(raw.status.as_deref().or(raw.legacy_status.as_deref()));

        Ok(Booking {
            id: raw.id,
            trip,
            user,
            seats,
            seat_count,
            from,
            to,
            total_fare: parse_amount(&raw.total_fare, "totalFare")?,
            payment_method,
            payment_status,
            status,
            created_at: raw.created_at,
        })
    }
}

pub fn bookings_from_raw(raw: Vec<Value>) -> Vec<Booking> {
    listing::<RawBooking, Booking>(raw, "booking")
}

// ---- auth ----

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLogin {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user: Option<RawUser>,
}

impl RawLogin {
    /// Split into the signed-in user and the bearer token
    pub fn into_parts(self) -> Result<(User, String), WireError> {
        let token = non_blank(self.token).ok_or(WireError::MissingField("token"))?;
        let nested = self.user.unwrap_or(RawUser {
            id: None,
            name: None,
            email: None,
            role: None,
        });
        let user = User {
            id: nested.id.or(self.id),
            name: non_blank(nested.name)
                .or(non_blank(self.name))
                .unwrap_or_default(),
            email: non_blank(nested.email).or(non_blank(self.email)),
            role: parse_role(nested.role.as_deref().or(self.role.as_deref())),
        };
        Ok((user, token))
    }
}

#[derive(Debug, Serialize)]
pub struct LoginBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> From<&'a Credentials> for LoginBody<'a> {
    fn from(c: &'a Credentials) -> Self {
        Self {
            email: &c.email,
            password: &c.password,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterBody<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> From<&'a Registration> for RegisterBody<'a> {
    fn from(r: &'a Registration) -> Self {
        Self {
            name: r.name.trim(),
            email: r.email.trim(),
            password: &r.password,
        }
    }
}

/// Error body the server sends with non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub message: Option<String>,
}

// ---- fleet ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripBody<'a> {
    pub bus_name: &'a str,
    pub bus_number: &'a str,
    pub name: &'a str,
    pub stop_names: &'a [String],
    pub start_date_time: Option<DateTime<Utc>>,
    pub end_date_time: Option<DateTime<Utc>>,
    pub seats_available: u32,
    pub is_active: bool,
}

impl<'a> From<&'a TripDraft> for CreateTripBody<'a> {
    fn from(d: &'a TripDraft) -> Self {
        Self {
            bus_name: d.bus_name.trim(),
            bus_number: d.bus_number.trim(),
            name: d.name.trim(),
            stop_names: &d.stop_names,
            start_date_time: d.starts_at,
            end_date_time: d.ends_at,
            seats_available: d.seats_available,
            is_active: d.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StopBody<'a> {
    pub name: &'a str,
    #[serde(rename = "fareFromStart", skip_serializing_if = "Option::is_none")]
    pub fare: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTripBody<'a> {
    pub bus_name: &'a str,
    pub bus_number: &'a str,
    pub name: &'a str,
    pub stops: Vec<StopBody<'a>>,
    pub start_date_time: Option<DateTime<Utc>>,
    pub end_date_time: Option<DateTime<Utc>>,
    pub seats_available: u32,
    pub is_active: bool,
}

impl<'a> From<&'a TripUpdate> for UpdateTripBody<'a> {
    fn from(u: &'a TripUpdate) -> Self {
        Self {
            bus_name: u.bus_name.trim(),
            bus_number: u.bus_number.trim(),
            name: u.name.trim(),
            stops: u
                .stops
                .iter()
                .map(|s| StopBody {
                    name: s.name.trim(),
                    fare: s.fare,
                })
                .collect(),
            start_date_time: u.starts_at,
            end_date_time: u.ends_at,
            seats_available: u.seats_available,
            is_active: u.is_active,
        }
    }
}

// ---- booking requests ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookBody<'a> {
    pub bus_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seats: Option<&'a [u32]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seats_booked: Option<u32>,
    pub payment_method: PaymentMethod,
}

impl<'a> From<&'a BookingRequest> for BookBody<'a> {
    fn from(r: &'a BookingRequest) -> Self {
        let (seats, from, to, seats_booked) = match &r.selection {
            SeatSelection::Numbered(seats) => (Some(seats.as_slice()), None, None, None),
            SeatSelection::Segment {
                origin,
                destination,
                seats,
            } => (
                None,
                Some(origin.trim()),
                Some(destination.trim()),
                Some(*seats),
            ),
        };
        Self {
            bus_id: &r.trip_id,
            seats,
            from,
            to,
            seats_booked,
            payment_method: r.payment_method,
        }
    }
}

// ---- admin stats ----

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSummary {
    pub total_revenue: Value,
    pub total_bookings: Value,
    pub total_buses: Value,
    pub total_users: Value,
    pub online_revenue: Value,
    pub cash_revenue: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMonth {
    pub name: String,
    pub revenue: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRoute {
    pub origin: String,
    pub destination: String,
    pub bookings: Value,
    pub revenue: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawBusPerformance {
    pub bus_name: String,
    pub bus_number: String,
    pub occupancy_rate: f64,
    pub total_revenue: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawStats {
    pub summary: RawSummary,
    pub monthly_trend: Vec<RawMonth>,
    pub top_routes: Vec<RawRoute>,
    pub bus_performance: Vec<RawBusPerformance>,
}

impl TryFrom<RawStats> for AdminStats {
    type Error = WireError;

    fn try_from(raw: RawStats) -> Result<Self, Self::Error> {
        let s = &raw.summary;
        let summary = StatsSummary {
            total_revenue: parse_amount(&s.total_revenue, "totalRevenue")?,
            total_bookings: parse_amount(&s.total_bookings, "totalBookings")?,
            total_buses: parse_amount(&s.total_buses, "totalBuses")?,
            total_users: parse_amount(&s.total_users, "totalUsers")?,
            online_revenue: parse_amount(&s.online_revenue, "onlineRevenue")?,
            cash_revenue: parse_amount(&s.cash_revenue, "cashRevenue")?,
        };

        let monthly_trend = raw
            .monthly_trend
            .into_iter()
            .map(|m| {
                Ok(MonthlyRevenue {
                    revenue: parse_amount(&m.revenue, "monthlyTrend.revenue")?,
                    name: m.name,
                })
            })
            .collect::<Result<_, WireError>>()?;

        let top_routes = raw
            .top_routes
            .into_iter()
            .map(|r| {
                Ok(RouteStat {
                    bookings: parse_amount(&r.bookings, "topRoutes.bookings")?,
                    revenue: parse_amount(&r.revenue, "topRoutes.revenue")?,
                    origin: r.origin,
                    destination: r.destination,
                })
            })
            .collect::<Result<_, WireError>>()?;

        let bus_performance = raw
            .bus_performance
            .into_iter()
            .map(|b| {
                Ok(BusPerformance {
                    total_revenue: parse_amount(&b.total_revenue, "busPerformance.totalRevenue")?,
                    occupancy_rate: if b.occupancy_rate.is_finite() {
                        b.occupancy_rate
                    } else {
                        0.0
                    },
                    bus_name: b.bus_name,
                    bus_number: b.bus_number,
                })
            })
            .collect::<Result<_, WireError>>()?;

        Ok(AdminStats {
            summary,
            monthly_trend,
            top_routes,
            bus_performance,
        })
    }
}
