use crate::manager::{BookingError, BookingLedger};
use crate::models::{BookingHandle, BookingRequest, BookingState};
use async_trait::async_trait;
use busline_catalog::{FareEngine, FareError, FareQuote, SeatSelection};
use busline_core::BoxError;
use busline_shared::{Booking, PaymentMethod, PaymentStatus, Trip};
use std::sync::Arc;

pub const CASH_NOTICE: &str = "Please pay the amount on boarding.";
pub const ONLINE_NOTICE: &str = "Payment confirmed.";

/// Where booking requests are sent
#[async_trait]
pub trait BookingGateway: Send + Sync {
    async fn submit_booking(&self, request: &BookingRequest) -> Result<Booking, BoxError>;
}

/// A quoted booking waiting for the rider to go ahead
#[derive(Debug, Clone)]
pub struct PendingCheckout {
    pub handle: BookingHandle,
    pub request: BookingRequest,
    pub quote: FareQuote,
    payment_confirmed: bool,
}

impl PendingCheckout {
    /// Online payments need an explicit confirmation step
    pub fn requires_confirmation(&self) -> bool {
        !self.request.payment_method.is_deferred() && !self.payment_confirmed
    }

    pub fn confirm_payment(&mut self) {
        self.payment_confirmed = true;
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub handle: BookingHandle,
    pub booking: Booking,
    pub state: BookingState,
    pub quote: FareQuote,
    pub notice: &'static str,
}

/// Drives a booking from quote to server confirmation
pub struct Checkout {
    engine: FareEngine,
    gateway: Arc<dyn BookingGateway>,
}

impl Checkout {
    pub fn new(engine: FareEngine, gateway: Arc<dyn BookingGateway>) -> Self {
        Self { engine, gateway }
    }

    /// Validate and price the selection, then record a draft
    pub fn prepare(
        &self,
        ledger: &mut BookingLedger,
        trip: &Trip,
        selection: SeatSelection,
        payment_method: PaymentMethod,
    ) -> Result<PendingCheckout, CheckoutError> {
        let quote = self.engine.quote(trip, &selection)?;
        let request = BookingRequest {
            trip_id: trip.id.clone(),
            selection,
            payment_method,
            quoted_total: quote.total,
        };
        let handle = ledger.draft(request.clone(), Some(trip.starts_at));

        tracing::debug!(
            trip_id = %trip.id,
            total = quote.total,
            method = %payment_method,
            "Prepared booking {}", handle
        );

        Ok(PendingCheckout {
            handle,
            request,
            quote,
            payment_confirmed: false,
        })
    }

    /// Send the booking. On failure the draft is kept so the rider can retry.
    pub async fn complete(
        &self,
        ledger: &mut BookingLedger,
        pending: PendingCheckout,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        if pending.requires_confirmation() {
            return Err(CheckoutError::PaymentNotConfirmed);
        }

        let handle = pending.handle;
        ledger.submit(&handle)?;

        let mut booking = match self.gateway.submit_booking(&pending.request).await {
            Ok(booking) => booking,
            Err(e) => {
                ledger.revert(&handle)?;
                tracing::warn!("Booking {} failed: {}", handle, e);
                return Err(CheckoutError::Gateway(e.to_string()));
            }
        };

        let method = pending.request.payment_method;
        booking.payment_method = method;
        booking.payment_status = if method.is_deferred() {
            PaymentStatus::Pending
        } else {
            PaymentStatus::Completed
        };

        if booking.total_fare != pending.quote.total {
            tracing::warn!(
                booking_id = %booking.id,
                quoted = pending.quote.total,
                charged = booking.total_fare,
                "Server fare differs from quote"
            );
        }

        ledger.accept(&handle, booking.clone())?;
        let state = BookingState::from_record(&booking);
        tracing::info!(booking_id = %booking.id, state = %state, "Booking placed");

        Ok(CheckoutOutcome {
            handle,
            booking,
            state,
            quote: pending.quote,
            notice: if method.is_deferred() {
                CASH_NOTICE
            } else {
                ONLINE_NOTICE
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Fare(#[from] FareError),

    #[error("Confirm the online payment before booking")]
    PaymentNotConfirmed,

    #[error("Booking failed: {0}")]
    Gateway(String),

    #[error(transparent)]
    Booking(#[from] BookingError),
}
