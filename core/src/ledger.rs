//! The booking ledger boundary.

use crate::error::Result;
use crate::types::{Booking, BookingDetails, BookingId, NewBooking, ResourceId, Transition, UserId};
use chrono::NaiveDate;
use futures::future::BoxFuture;

/// Storage of bookings and their status state machine.
///
/// Implementations must guarantee that at most one booking with status
/// `pending` or `confirmed` exists per `(resource, date)`, even under
/// concurrent `create_booking` calls, and must apply transitions only when
/// the booking currently has [`Transition::required_from`].
pub trait BookingLedger: Send + Sync {
    /// Inserts a `pending` booking.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`](crate::BookingError::NotFound) if the resource is absent or inactive
    /// - [`BookingError::SlotTaken`](crate::BookingError::SlotTaken) if the slot is held; nothing is written
    /// - [`BookingError::Storage`](crate::BookingError::Storage) on persistence failure
    fn create_booking(&self, booking: NewBooking) -> BoxFuture<'_, Result<BookingId>>;

    /// Applies a moderator transition and returns the updated booking.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`](crate::BookingError::NotFound) if no such booking exists
    /// - [`BookingError::InvalidTransition`](crate::BookingError::InvalidTransition) if the
    ///   booking is in another status; the booking is unchanged
    fn transition(
        &self,
        id: BookingId,
        transition: Transition,
        moderator: UserId,
    ) -> BoxFuture<'_, Result<Booking>>;

    /// `pending → confirmed`
    ///
    /// # Errors
    ///
    /// See [`BookingLedger::transition`].
    fn confirm(&self, id: BookingId, moderator: UserId) -> BoxFuture<'_, Result<Booking>> {
        self.transition(id, Transition::Confirm, moderator)
    }

    /// `pending → cancelled`
    ///
    /// # Errors
    ///
    /// See [`BookingLedger::transition`].
    fn reject(&self, id: BookingId, moderator: UserId) -> BoxFuture<'_, Result<Booking>> {
        self.transition(id, Transition::Reject, moderator)
    }

    /// `confirmed → cancelled`
    ///
    /// # Errors
    ///
    /// See [`BookingLedger::transition`].
    fn cancel(&self, id: BookingId, moderator: UserId) -> BoxFuture<'_, Result<Booking>> {
        self.transition(id, Transition::Cancel, moderator)
    }

    /// One booking
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`](crate::BookingError::NotFound) if absent.
    fn get(&self, id: BookingId) -> BoxFuture<'_, Result<Booking>>;

    /// One booking with its resource name and category
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`](crate::BookingError::NotFound) if absent.
    fn get_details(&self, id: BookingId) -> BoxFuture<'_, Result<BookingDetails>>;

    /// Pending bookings, oldest first
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`](crate::BookingError::Storage) on persistence failure.
    fn list_pending(&self) -> BoxFuture<'_, Result<Vec<BookingDetails>>>;

    /// Non-cancelled bookings of one resource within a month, by date
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`](crate::BookingError::Validation) for a
    /// month outside `1..=12`.
    fn list_for_resource_month(
        &self,
        resource_id: ResourceId,
        year: i32,
        month: u32,
    ) -> BoxFuture<'_, Result<Vec<Booking>>>;

    /// Non-cancelled bookings on one date across resources, by resource sort order
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`](crate::BookingError::Storage) on persistence failure.
    fn list_for_date(&self, date: NaiveDate) -> BoxFuture<'_, Result<Vec<BookingDetails>>>;
}
