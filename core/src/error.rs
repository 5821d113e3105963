//! Error types for the booking engine.

use crate::types::{BookingId, BookingStatus, ResourceId, UserId};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors returned by catalog, ledger and moderation operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// The referenced resource or booking does not exist (or the resource is inactive)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The booking is not in the status the transition requires
    #[error("Invalid transition for booking {booking_id}: {from} -> {to}")]
    InvalidTransition {
        /// Booking that was addressed
        booking_id: BookingId,
        /// Status the booking actually has
        from: BookingStatus,
        /// Status the caller asked for
        to: BookingStatus,
    },

    /// Another active booking already holds the resource on that date
    #[error("Resource {resource_id} is already booked on {date}")]
    SlotTaken {
        /// Requested resource
        resource_id: ResourceId,
        /// Requested date
        date: NaiveDate,
    },

    /// Input rejected before touching storage
    #[error("Validation error: {0}")]
    Validation(String),

    /// The actor is not a moderator
    #[error("User {actor} is not allowed to moderate")]
    Forbidden {
        /// Who tried
        actor: UserId,
    },

    /// Persistence failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BookingError {
    /// `NotFound` for a resource
    #[must_use]
    pub fn resource_not_found(id: ResourceId) -> Self {
        Self::NotFound(format!("resource {id}"))
    }

    /// `NotFound` for a booking
    #[must_use]
    pub fn booking_not_found(id: BookingId) -> Self {
        Self::NotFound(format!("booking {id}"))
    }
}

/// Result type for booking operations
pub type Result<T> = std::result::Result<T, BookingError>;
