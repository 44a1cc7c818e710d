//! Active and history listings over the ledger.

use crate::manager::BookingLedger;
use crate::models::{BookingState, TrackedBooking};
use chrono::{DateTime, Utc};

/// Cancelled, or the trip has already left
pub fn is_history(booking: &TrackedBooking, now: DateTime<Utc>) -> bool {
    booking.state == BookingState::Cancelled || booking.has_departed(now)
}

/// Upcoming bookings the server knows about
pub fn active(ledger: &BookingLedger, now: DateTime<Utc>) -> Vec<&TrackedBooking> {
    ledger
        .iter()
        .filter(|b| b.record.is_some() && !is_history(b, now))
        .collect()
}

pub fn history(ledger: &BookingLedger, now: DateTime<Utc>) -> Vec<&TrackedBooking> {
    ledger
        .iter()
        .filter(|b| b.record.is_some() && is_history(b, now))
        .collect()
}

/// Bookings still waiting on a cash payment
pub fn awaiting_payment(ledger: &BookingLedger) -> Vec<&TrackedBooking> {
    ledger
        .iter()
        .filter(|b| b.state == BookingState::PendingPayment)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use busline_shared::{Booking, BookingStatus, PaymentMethod, PaymentStatus, TripSummary};
    use chrono::Duration;

    fn record(id: &str, offset_hours: i64, status: BookingStatus, payment: PaymentStatus) -> Booking {
        Booking {
            id: id.to_string(),
            trip: TripSummary {
                id: "t".to_string(),
                bus_name: "Deccan".to_string(),
                bus_number: "TS08AA1234".to_string(),
                from: "Hyderabad".to_string(),
                to: "Vijayawada".to_string(),
                starts_at: Some(Utc::now() + Duration::hours(offset_hours)),
            },
            user: None,
            seats: vec![],
            seat_count: 1,
            from: "Hyderabad".to_string(),
            to: "Vijayawada".to_string(),
            total_fare: 450,
            payment_method: PaymentMethod::Cash,
            payment_status: payment,
            status,
            created_at: None,
        }
    }

    #[test]
    fn test_active_and_history_split() {
        let mut ledger = BookingLedger::new();
        ledger.track(record("upcoming", 5, BookingStatus::Confirmed, PaymentStatus::Pending));
        ledger.track(record("departed", -5, BookingStatus::Confirmed, PaymentStatus::Completed));
        ledger.track(record("cancelled", 5, BookingStatus::Cancelled, PaymentStatus::Pending));

        let now = Utc::now();
        let active_ids: Vec<_> = active(&ledger, now).iter().filter_map(|b| b.server_id()).collect();
        let history_ids: Vec<_> = history(&ledger, now).iter().filter_map(|b| b.server_id()).collect();

        assert_eq!(active_ids, vec!["upcoming"]);
        assert_eq!(history_ids, vec!["departed", "cancelled"]);
        assert_eq!(awaiting_payment(&ledger).len(), 1);
    }

    #[test]
    fn test_drafts_not_listed() {
        use crate::models::BookingRequest;
        use busline_catalog::SeatSelection;

        let mut ledger = BookingLedger::new();
        ledger.draft(
            BookingRequest {
                trip_id: "t".to_string(),
                selection: SeatSelection::Numbered(vec![1]),
                payment_method: PaymentMethod::Online,
                quoted_total: 300,
            },
            None,
        );
        assert!(active(&ledger, Utc::now()).is_empty());
        assert!(history(&ledger, Utc::now()).is_empty());
    }
}
