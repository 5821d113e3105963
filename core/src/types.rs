//! Domain types for the booking engine.
//!
//! Resources are the reservable objects of the catalog. Bookings are the
//! reservation records kept by the ledger; their status only moves through
//! the closed [`Transition`] table.

use crate::error::BookingError;
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a reservable resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(i64);

impl ResourceId {
    /// Creates a `ResourceId` from its raw value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(i64);

impl BookingId {
    /// Creates a `BookingId` from its raw value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat identity of a requester or moderator
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Creates a `UserId` from its raw value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resource category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Gazebos on the fishing shore
    #[serde(rename = "gazebo_fishing")]
    FishingGazebo,
    /// Gazebos in the recreation area
    #[serde(rename = "gazebo_recreation")]
    RecreationGazebo,
    /// Cabins for overnight stays
    #[serde(rename = "house")]
    Cabin,
}

impl Category {
    /// All categories in menu order
    pub const ALL: [Self; 3] = [Self::FishingGazebo, Self::RecreationGazebo, Self::Cabin];

    /// Storage key of the category
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FishingGazebo => "gazebo_fishing",
            Self::RecreationGazebo => "gazebo_recreation",
            Self::Cabin => "house",
        }
    }

    /// Resolves a deep-link start argument to a category.
    ///
    /// Accepts the storage keys plus the short `fishing`, `recreation` and
    /// `house` aliases, optionally prefixed with `site_`. Case-insensitive.
    #[must_use]
    pub fn from_start_argument(arg: &str) -> Option<Self> {
        let normalized = arg.trim().to_lowercase();
        let key = normalized.strip_prefix("site_").unwrap_or(&normalized);
        match key {
            "fishing" | "gazebo_fishing" => Some(Self::FishingGazebo),
            "recreation" | "gazebo_recreation" => Some(Self::RecreationGazebo),
            "house" => Some(Self::Cabin),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gazebo_fishing" => Ok(Self::FishingGazebo),
            "gazebo_recreation" => Ok(Self::RecreationGazebo),
            "house" => Ok(Self::Cabin),
            other => Err(BookingError::Validation(format!("unknown category '{other}'"))),
        }
    }
}

/// Set of weekdays priced at the weekend rate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeekendDays(Vec<Weekday>);

impl WeekendDays {
    /// Creates a weekend set from explicit days
    #[must_use]
    pub fn new(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut days: Vec<Weekday> = days.into_iter().collect();
        days.sort_by_key(Weekday::num_days_from_monday);
        days.dedup();
        Self(days)
    }

    /// Parses a comma-separated list such as `"sat,sun"`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] if any entry is not a weekday name
    /// or the list is empty.
    pub fn parse(list: &str) -> Result<Self, BookingError> {
        let days = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<Weekday>()
                    .map_err(|_| BookingError::Validation(format!("unknown weekday '{s}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if days.is_empty() {
            return Err(BookingError::Validation("weekend day list is empty".to_string()));
        }

        Ok(Self::new(days))
    }

    /// Whether the date falls on a weekend day
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&date.weekday())
    }

    /// Configured days, Monday first
    #[must_use]
    pub fn days(&self) -> &[Weekday] {
        &self.0
    }
}

impl Default for WeekendDays {
    fn default() -> Self {
        Self::new([Weekday::Sat, Weekday::Sun])
    }
}

/// A reservable object of the catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservableResource {
    /// Unique identifier
    pub id: ResourceId,
    /// Display name
    pub name: String,
    /// Category
    pub category: Category,
    /// Maximum number of guests
    pub capacity: u32,
    /// Price on working days
    pub weekday_price: i64,
    /// Price on weekend days
    pub weekend_price: i64,
    /// Free-text description
    pub description: String,
    /// Inactive resources are hidden from users and cannot be booked
    pub is_active: bool,
    /// Menu position, ascending
    pub sort_order: i32,
}

impl ReservableResource {
    /// Price for a stay on the given date
    #[must_use]
    pub fn price_on(&self, date: NaiveDate, weekend: &WeekendDays) -> i64 {
        if weekend.contains(date) {
            self.weekend_price
        } else {
            self.weekday_price
        }
    }
}

/// Fields needed to create a resource
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResource {
    /// Display name
    pub name: String,
    /// Category
    pub category: Category,
    /// Maximum number of guests
    pub capacity: u32,
    /// Price on working days
    pub weekday_price: i64,
    /// Price on weekend days
    pub weekend_price: i64,
    /// Free-text description
    pub description: String,
    /// Menu position
    pub sort_order: i32,
}

impl NewResource {
    /// Checks capacity and prices.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for an empty name, zero capacity or
    /// negative prices.
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.name.trim().is_empty() {
            return Err(BookingError::Validation("resource name is empty".to_string()));
        }
        if self.capacity == 0 {
            return Err(BookingError::Validation("capacity must be positive".to_string()));
        }
        check_price("weekday_price", self.weekday_price)?;
        check_price("weekend_price", self.weekend_price)
    }
}

/// Moderator-editable subset of a resource.
///
/// Name, category and capacity are fixed once a resource exists and have no
/// field here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUpdate {
    /// New weekday price
    pub weekday_price: Option<i64>,
    /// New weekend price
    pub weekend_price: Option<i64>,
    /// New description
    pub description: Option<String>,
    /// New menu position
    pub sort_order: Option<i32>,
    /// New active flag
    pub is_active: Option<bool>,
}

impl ResourceUpdate {
    /// Whether the update changes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.weekday_price.is_none()
            && self.weekend_price.is_none()
            && self.description.is_none()
            && self.sort_order.is_none()
            && self.is_active.is_none()
    }

    /// Rejects negative prices.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] naming the offending field.
    pub fn validate(&self) -> Result<(), BookingError> {
        if let Some(price) = self.weekday_price {
            check_price("weekday_price", price)?;
        }
        if let Some(price) = self.weekend_price {
            check_price("weekend_price", price)?;
        }
        Ok(())
    }

    /// Applies the update to a resource in place
    pub fn apply_to(&self, resource: &mut ReservableResource) {
        if let Some(price) = self.weekday_price {
            resource.weekday_price = price;
        }
        if let Some(price) = self.weekend_price {
            resource.weekend_price = price;
        }
        if let Some(description) = &self.description {
            resource.description.clone_from(description);
        }
        if let Some(order) = self.sort_order {
            resource.sort_order = order;
        }
        if let Some(active) = self.is_active {
            resource.is_active = active;
        }
    }
}

fn check_price(field: &str, price: i64) -> Result<(), BookingError> {
    if price < 0 {
        return Err(BookingError::Validation(format!("{field} must not be negative")));
    }
    Ok(())
}

/// Catalog used to seed an empty store
#[must_use]
pub fn default_catalog() -> Vec<NewResource> {
    let gazebo = |name: &str, category, capacity, price, order| NewResource {
        name: name.to_string(),
        category,
        capacity,
        weekday_price: price,
        weekend_price: price,
        description: format!("Gazebo for up to {capacity} people"),
        sort_order: order,
    };
    let cabin = |name: &str, price, order, description: &str| NewResource {
        name: name.to_string(),
        category: Category::Cabin,
        capacity: 4,
        weekday_price: price,
        weekend_price: price,
        description: description.to_string(),
        sort_order: order,
    };

    vec![
        gazebo("Small gazebo #1", Category::FishingGazebo, 6, 2000, 10),
        gazebo("Small gazebo #2", Category::FishingGazebo, 6, 2000, 20),
        gazebo("Large gazebo #1", Category::FishingGazebo, 8, 3000, 30),
        gazebo("Small gazebo #3", Category::RecreationGazebo, 6, 2000, 10),
        gazebo("Large gazebo #2", Category::RecreationGazebo, 8, 3000, 20),
        gazebo("VIP gazebo", Category::RecreationGazebo, 15, 10000, 30),
        cabin(
            "Cabin #1",
            6000,
            10,
            "Standard cabin: double bed, two single beds, bathroom, kitchen",
        ),
        cabin(
            "Cabin #2",
            6000,
            20,
            "Standard cabin: double bed, two single beds, bathroom, kitchen",
        ),
        cabin(
            "Improved cabin",
            7000,
            30,
            "Improved cabin: double bed, two single beds, bathroom, kitchen, TV, air conditioning",
        ),
    ]
}

/// Booking status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Waiting for a moderator
    Pending,
    /// Approved by a moderator
    Confirmed,
    /// Rejected or revoked; terminal
    Cancelled,
}

impl BookingStatus {
    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the booking holds its slot
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(BookingError::Validation(format!("unknown booking status '{other}'"))),
        }
    }
}

/// A moderator transition of the booking state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// `pending → confirmed`
    Confirm,
    /// `pending → cancelled`
    Reject,
    /// `confirmed → cancelled`
    Cancel,
}

impl Transition {
    /// Status the booking must currently have
    #[must_use]
    pub const fn required_from(self) -> BookingStatus {
        match self {
            Self::Confirm | Self::Reject => BookingStatus::Pending,
            Self::Cancel => BookingStatus::Confirmed,
        }
    }

    /// Status after the transition
    #[must_use]
    pub const fn target(self) -> BookingStatus {
        match self {
            Self::Confirm => BookingStatus::Confirmed,
            Self::Reject | Self::Cancel => BookingStatus::Cancelled,
        }
    }

    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
        }
    }
}

/// A reservation record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique identifier
    pub id: BookingId,
    /// Reserved resource
    pub resource_id: ResourceId,
    /// Reserved date
    pub booking_date: NaiveDate,
    /// Who asked for the reservation
    pub user_id: UserId,
    /// Requester display name
    pub user_name: String,
    /// Requester phone
    pub user_phone: String,
    /// Current status
    pub status: BookingStatus,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
    /// When the booking last changed
    pub updated_at: DateTime<Utc>,
    /// Moderator who applied the last transition
    pub moderator_id: Option<UserId>,
}

impl Booking {
    /// Applies a transition in memory.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidTransition`] when the current status is
    /// not the one the transition requires. The booking is left untouched.
    pub fn apply(
        &mut self,
        transition: Transition,
        moderator: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        if self.status != transition.required_from() {
            return Err(BookingError::InvalidTransition {
                booking_id: self.id,
                from: self.status,
                to: transition.target(),
            });
        }
        self.status = transition.target();
        self.moderator_id = Some(moderator);
        self.updated_at = at;
        Ok(())
    }
}

/// A booking joined with its resource name and category
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDetails {
    /// The booking
    #[serde(flatten)]
    pub booking: Booking,
    /// Resource display name
    pub resource_name: String,
    /// Resource category
    pub category: Category,
}

/// Fields needed to create a booking
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    /// Resource to reserve
    pub resource_id: ResourceId,
    /// Date to reserve
    pub date: NaiveDate,
    /// Requester identity
    pub requester: UserId,
    /// Requester display name
    pub name: String,
    /// Requester phone
    pub phone: String,
}
