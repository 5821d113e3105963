//! Session state and actions of the booking dialogue.

use lakeside_core::{
    BookingError, BookingId, Category, MonthAvailability, NaiveDate, ReservableResource,
    ResourceId, UserId,
};
use serde::{Deserialize, Serialize};

/// Where the requester is in the dialogue
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// No dialogue in progress
    #[default]
    Idle,
    /// Browsing the resources of a category
    CategorySelected,
    /// Browsing a resource's calendar
    ResourceSelected,
    /// Waiting for the requester's name
    EnteringName,
    /// Waiting for the requester's phone
    EnteringPhone,
    /// Waiting for the final confirmation
    Confirming,
}

impl Step {
    /// Label for logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CategorySelected => "category_selected",
            Self::ResourceSelected => "resource_selected",
            Self::EnteringName => "entering_name",
            Self::EnteringPhone => "entering_phone",
            Self::Confirming => "confirming",
        }
    }

    /// Whether category and resource menus are live
    #[must_use]
    pub const fn is_browsing(self) -> bool {
        matches!(self, Self::Idle | Self::CategorySelected | Self::ResourceSelected)
    }
}

/// Fields collected so far
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Chosen category
    pub category: Option<Category>,
    /// Chosen resource
    pub resource: Option<ReservableResource>,
    /// Calendar currently shown to the requester
    pub calendar: Option<MonthAvailability>,
    /// Chosen day
    pub date: Option<NaiveDate>,
    /// Entered name, trimmed
    pub name: Option<String>,
    /// Entered phone, trimmed
    pub phone: Option<String>,
    /// Price for the chosen day
    pub price: Option<i64>,
}

/// One requester's dialogue
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSession {
    /// Owner of the session
    pub user: UserId,
    /// Current step
    pub step: Step,
    /// Collected fields
    pub draft: Draft,
}

impl ConversationSession {
    /// Back to idle with an empty draft
    pub fn clear(&mut self) {
        self.step = Step::Idle;
        self.draft = Draft::default();
    }

    /// Whether nothing is in progress
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.step == Step::Idle && self.draft == Draft::default()
    }
}

impl From<UserId> for ConversationSession {
    fn from(user: UserId) -> Self {
        Self { user, step: Step::Idle, draft: Draft::default() }
    }
}

/// Inputs of the dialogue.
///
/// The first group comes from the requester; the second group is fed back by
/// effects once storage has answered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversationAction {
    /// Open the booking menu, optionally deep-linked to a category
    Start {
        /// Deep-link argument
        payload: Option<String>,
    },
    /// Pick a category
    SelectCategory(Category),
    /// Pick a resource
    SelectResource(ResourceId),
    /// Show another month of the current resource
    ShowMonth {
        /// Calendar year
        year: i32,
        /// Calendar month, 1-12
        month: u32,
    },
    /// Pick a day of the calendar
    SelectDay(NaiveDate),
    /// Free text (name or phone)
    Text(String),
    /// Submit the draft
    Confirm,
    /// Abandon the draft
    Cancel,

    /// Active resources of a category were read
    ResourcesLoaded {
        /// Requested category
        category: Category,
        /// Resources in menu order
        resources: Vec<ReservableResource>,
    },
    /// A resource and one month of its availability were read
    CalendarLoaded {
        /// The resource
        resource: ReservableResource,
        /// Its availability
        availability: MonthAvailability,
    },
    /// The requested resource is absent or inactive
    ResourceMissing(ResourceId),
    /// The draft was stored as a pending booking
    BookingSubmitted(BookingId),
    /// Storing the draft failed
    BookingRejected {
        /// Requested day
        date: NaiveDate,
        /// Why
        error: BookingError,
    },
    /// A read failed
    LoadFailed(BookingError),
}

impl ConversationAction {
    /// Label for logs and metrics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::SelectCategory(_) => "select_category",
            Self::SelectResource(_) => "select_resource",
            Self::ShowMonth { .. } => "show_month",
            Self::SelectDay(_) => "select_day",
            Self::Text(_) => "text",
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::ResourcesLoaded { .. } => "resources_loaded",
            Self::CalendarLoaded { .. } => "calendar_loaded",
            Self::ResourceMissing(_) => "resource_missing",
            Self::BookingSubmitted(_) => "booking_submitted",
            Self::BookingRejected { .. } => "booking_rejected",
            Self::LoadFailed(_) => "load_failed",
        }
    }
}
