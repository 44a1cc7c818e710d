use crate::models::{BookingHandle, BookingRequest, BookingState, TrackedBooking};
use busline_shared::{Booking, BookingStatus, PaymentStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Tracks bookings and enforces their state transitions
pub struct BookingLedger {
    bookings: HashMap<BookingHandle, TrackedBooking>,
    /// Insertion order, so listings keep the server's ordering
    order: Vec<BookingHandle>,
}

impl BookingLedger {
    pub fn new() -> Self {
        Self {
            bookings: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Start a booking that has not been sent yet
    pub fn draft(
        &mut self,
        request: BookingRequest,
        departs_at: Option<DateTime<Utc>>,
    ) -> BookingHandle {
        self.insert(TrackedBooking::draft(request, departs_at))
    }

    /// Track a booking loaded from the server. A booking already tracked
    /// under the same server id is refreshed in place, unless it has
    /// already reached a final state.
    pub fn track(&mut self, record: Booking) -> BookingHandle {
        if let Some(handle) = self.find_by_id(&record.id) {
            if let Some(tracked) = self.bookings.get_mut(&handle) {
                let next = BookingState::from_record(&record);
                if tracked.state.is_terminal() && next != tracked.state {
                    tracing::warn!(
                        booking_id = %record.id,
                        "Ignoring stale record: booking is {}, server says {}",
                        tracked.state,
                        next
                    );
                    return handle;
                }
                tracked.departs_at = record.trip.starts_at.or(tracked.departs_at);
                tracked.set_state(BookingState::from_record(&record));
                tracked.record = Some(record);
            }
            return handle;
        }
        self.insert(TrackedBooking::from_record(record))
    }

    /// Replace everything tracked with a fresh listing from the server
    pub fn sync(&mut self, records: Vec<Booking>) {
        self.bookings.clear();
        self.order.clear();
        for record in records {
            self.track(record);
        }
    }

    pub fn get(&self, handle: &BookingHandle) -> Option<&TrackedBooking> {
        self.bookings.get(handle)
    }

    pub fn find_by_id(&self, server_id: &str) -> Option<BookingHandle> {
        self.order
            .iter()
            .find(|h| {
                self.bookings
                    .get(h)
                    .and_then(|b| b.server_id())
                    .map(|id| id == server_id)
                    .unwrap_or(false)
            })
            .copied()
    }

    /// All tracked bookings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TrackedBooking> {
        self.order.iter().filter_map(|h| self.bookings.get(h))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Transition: Draft → Submitted (request in flight)
    pub fn submit(&mut self, handle: &BookingHandle) -> Result<(), BookingError> {
        self.transition(handle, BookingState::Submitted)
    }

    /// Transition: Submitted → Draft after the server refused or was unreachable
    pub fn revert(&mut self, handle: &BookingHandle) -> Result<(), BookingError> {
        self.transition(handle, BookingState::Draft)
    }

    /// Transition: Submitted → Confirmed | PendingPayment, depending on
    /// the payment state of the record the server returned
    pub fn accept(&mut self, handle: &BookingHandle, record: Booking) -> Result<(), BookingError> {
        let next = BookingState::from_record(&record);
        let tracked = self.get_mut(handle)?;
        check(tracked.state, next)?;

        tracked.departs_at = record.trip.starts_at.or(tracked.departs_at);
        tracked.record = Some(record);
        tracked.set_state(next);
        Ok(())
    }

    /// Transition: PendingPayment → Completed (cash collected)
    pub fn confirm_payment(&mut self, handle: &BookingHandle) -> Result<(), BookingError> {
        self.transition(handle, BookingState::Completed)?;
        if let Some(record) = self.get_mut(handle)?.record.as_mut() {
            record.payment_status = PaymentStatus::Completed;
        }
        Ok(())
    }

    /// Cancel a booking. Completed and already cancelled bookings are final.
    pub fn cancel(&mut self, handle: &BookingHandle) -> Result<(), BookingError> {
        self.transition(handle, BookingState::Cancelled)?;
        if let Some(record) = self.get_mut(handle)?.record.as_mut() {
            record.status = BookingStatus::Cancelled;
        }
        Ok(())
    }

    /// Cancel unpaid bookings whose trip has already left. Returns the
    /// handles that were cancelled.
    pub fn expire_unpaid(&mut self, now: DateTime<Utc>) -> Vec<BookingHandle> {
        let expired: Vec<BookingHandle> = self
            .iter()
            .filter(|b| b.state == BookingState::PendingPayment && b.has_departed(now))
            .map(|b| b.handle)
            .collect();

        for handle in &expired {
            if let Err(e) = self.cancel(handle) {
                tracing::warn!("Failed to expire booking {}: {}", handle, e);
            }
        }
        if !expired.is_empty() {
            tracing::info!("Expired {} unpaid bookings", expired.len());
        }
        expired
    }

    fn transition(&mut self, handle: &BookingHandle, next: BookingState) -> Result<(), BookingError> {
        let tracked = self.get_mut(handle)?;
        check(tracked.state, next)?;
        tracked.set_state(next);
        Ok(())
    }

    fn insert(&mut self, tracked: TrackedBooking) -> BookingHandle {
        let handle = tracked.handle;
        self.bookings.insert(handle, tracked);
        self.order.push(handle);
        handle
    }

    fn get_mut(&mut self, handle: &BookingHandle) -> Result<&mut TrackedBooking, BookingError> {
        self.bookings
            .get_mut(handle)
            .ok_or_else(|| BookingError::NotFound(handle.to_string()))
    }
}

impl Default for BookingLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn check(from: BookingState, to: BookingState) -> Result<(), BookingError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(BookingError::InvalidTransition { from, to })
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("Booking not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: BookingState,
        to: BookingState,
    },
}
