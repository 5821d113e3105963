//! Chat-side boundaries: outbound payloads, the transport that delivers
//! them, and the moderator roster.
//!
//! Payloads are structured. Turning them into text, buttons or a specific
//! chat network's markup is the transport's job.

use crate::availability::MonthAvailability;
use crate::types::{BookingDetails, BookingId, Category, ReservableResource, ResourceId, UserId};
use chrono::NaiveDate;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A message for one recipient
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Category menu
    ChooseCategory {
        /// Categories to offer
        categories: Vec<Category>,
    },
    /// Active resources of a category
    ResourceList {
        /// Selected category
        category: Category,
        /// Resources in menu order
        resources: Vec<ReservableResource>,
    },
    /// The category has no active resources
    NoResources {
        /// Selected category
        category: Category,
    },
    /// Month calendar for a resource
    Calendar {
        /// Selected resource
        resource: ReservableResource,
        /// Day statuses
        availability: MonthAvailability,
        /// Whether navigating to the previous month is allowed
        can_go_back: bool,
    },
    /// The picked day cannot be booked
    DateUnavailable {
        /// Picked day
        date: NaiveDate,
    },
    /// The resource is absent or inactive
    ResourceUnavailable {
        /// Requested resource
        resource_id: ResourceId,
    },
    /// Prompt for the requester's name
    AskName {
        /// Selected resource
        resource_name: String,
        /// Selected day
        date: NaiveDate,
    },
    /// Name rejected; prompt again
    InvalidName,
    /// Prompt for the requester's phone
    AskPhone,
    /// Phone rejected; prompt again
    InvalidPhone,
    /// Draft summary awaiting confirmation
    Summary {
        /// Selected resource
        resource_name: String,
        /// Selected day
        date: NaiveDate,
        /// Entered name
        name: String,
        /// Entered phone
        phone: String,
        /// Price for the day
        price: i64,
    },
    /// The booking was stored as pending
    BookingSubmitted {
        /// New booking
        booking_id: BookingId,
    },
    /// Someone else took the slot in the meantime
    DateTaken {
        /// Requested day
        date: NaiveDate,
    },
    /// Booking could not be stored
    BookingFailed,
    /// The dialogue was abandoned
    Cancelled,
    /// Moderator alert for a new pending booking
    NewBookingAlert {
        /// The booking
        details: BookingDetails,
    },
    /// Requester alert after a moderator transition
    StatusChanged {
        /// The booking after the transition
        details: BookingDetails,
    },
    /// Pending bookings, oldest first
    PendingQueue {
        /// Queue contents
        bookings: Vec<BookingDetails>,
    },
    /// One booking with moderation controls
    BookingDetail {
        /// The booking
        details: BookingDetails,
    },
    /// Full resource list including inactive ones
    ResourceCatalog {
        /// Resources in menu order
        resources: Vec<ReservableResource>,
    },
    /// Active bookings on one day
    DayOverview {
        /// The day
        date: NaiveDate,
        /// Bookings by resource order
        bookings: Vec<BookingDetails>,
    },
    /// A moderator command failed
    ModerationFailed {
        /// Human-readable reason
        reason: String,
    },
}

impl Outbound {
    /// Short label for logs and metrics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ChooseCategory { .. } => "choose_category",
            Self::ResourceList { .. } => "resource_list",
            Self::NoResources { .. } => "no_resources",
            Self::Calendar { .. } => "calendar",
            Self::DateUnavailable { .. } => "date_unavailable",
            Self::ResourceUnavailable { .. } => "resource_unavailable",
            Self::AskName { .. } => "ask_name",
            Self::InvalidName => "invalid_name",
            Self::AskPhone => "ask_phone",
            Self::InvalidPhone => "invalid_phone",
            Self::Summary { .. } => "summary",
            Self::BookingSubmitted { .. } => "booking_submitted",
            Self::DateTaken { .. } => "date_taken",
            Self::BookingFailed => "booking_failed",
            Self::Cancelled => "cancelled",
            Self::NewBookingAlert { .. } => "new_booking_alert",
            Self::StatusChanged { .. } => "status_changed",
            Self::PendingQueue { .. } => "pending_queue",
            Self::BookingDetail { .. } => "booking_detail",
            Self::ResourceCatalog { .. } => "resource_catalog",
            Self::DayOverview { .. } => "day_overview",
            Self::ModerationFailed { .. } => "moderation_failed",
        }
    }
}

/// Delivery failure for one recipient
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The recipient cannot be reached (blocked the bot, unknown chat)
    #[error("Recipient {recipient} unreachable: {reason}")]
    Unreachable {
        /// Intended recipient
        recipient: UserId,
        /// Transport-specific reason
        reason: String,
    },

    /// The transport itself failed
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Sends outbound payloads to chat users
pub trait ChatTransport: Send + Sync {
    /// Delivers one message to one recipient
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] if the message was not delivered.
    fn send(&self, to: UserId, message: Outbound) -> BoxFuture<'_, Result<(), DeliveryError>>;
}

/// Read-only moderator roster
pub trait Authorization: Send + Sync {
    /// Whether the identity may moderate
    fn is_admin(&self, user: UserId) -> bool;

    /// Everyone who receives new-booking alerts
    fn moderators(&self) -> Vec<UserId>;
}
