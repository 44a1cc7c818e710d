use busline_catalog::SeatSelection;
use busline_shared::{Booking, BookingStatus, PaymentMethod, PaymentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Booking lifecycle as the client tracks it.
///
/// ```text
/// Draft -> Submitted -> Confirmed ------------------> Cancelled
///                    -> PendingPayment -> Completed
///                                      -> Cancelled
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingState {
    Draft,
    Submitted,
    Confirmed,
    PendingPayment,
    Completed,
    Cancelled,
}

impl BookingState {
    /// Derive the state of a booking the server already holds
    pub fn from_record(booking: &Booking) -> Self {
        if booking.status == BookingStatus::Cancelled {
            return BookingState::Cancelled;
        }
        match (booking.payment_method, booking.payment_status) {
            (PaymentMethod::Online, PaymentStatus::Completed) => BookingState::Confirmed,
            (PaymentMethod::Cash, PaymentStatus::Completed) => BookingState::Completed,
            (_, PaymentStatus::Pending) => BookingState::PendingPayment,
        }
    }

    pub fn can_transition_to(&self, next: BookingState) -> bool {
        use BookingState::*;
        matches!(
            (self, next),
            (Draft, Submitted)
                | (Draft, Cancelled)
                | (Submitted, Draft)
                | (Submitted, Confirmed)
                | (Submitted, PendingPayment)
                | (Confirmed, Cancelled)
                | (PendingPayment, Completed)
                | (PendingPayment, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingState::Completed | BookingState::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookingState::Draft => "Draft",
            BookingState::Submitted => "Submitted",
            BookingState::Confirmed => "Confirmed",
            BookingState::PendingPayment => "Pending",
            BookingState::Completed => "Completed",
            BookingState::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Local key for a tracked booking. Drafts have no server id yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BookingHandle(pub Uuid);

impl BookingHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BookingHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// What gets sent to the server to create a booking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingRequest {
    pub trip_id: String,
    pub selection: SeatSelection,
    pub payment_method: PaymentMethod,
    /// Client-side quote, for comparison with the server's figure
    pub quoted_total: u64,
}

/// A booking plus its client-side lifecycle state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedBooking {
    pub handle: BookingHandle,
    pub state: BookingState,
    pub request: Option<BookingRequest>,
    pub record: Option<Booking>,
    pub departs_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TrackedBooking {
    pub fn draft(request: BookingRequest, departs_at: Option<DateTime<Utc>>) -> Self {
        Self {
            handle: BookingHandle::new(),
            state: BookingState::Draft,
            request: Some(request),
            record: None,
            departs_at,
            updated_at: Utc::now(),
        }
    }

    pub fn from_record(record: Booking) -> Self {
        Self {
            handle: BookingHandle::new(),
            state: BookingState::from_record(&record),
            request: None,
            departs_at: record.trip.starts_at,
            record: Some(record),
            updated_at: Utc::now(),
        }
    }

    /// Server id, once the booking exists server-side
    pub fn server_id(&self) -> Option<&str> {
        self.record.as_ref().map(|r| r.id.as_str())
    }

    pub fn has_departed(&self, now: DateTime<Utc>) -> bool {
        self.departs_at.map(|t| t <= now).unwrap_or(false)
    }

    pub(crate) fn set_state(&mut self, state: BookingState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}
