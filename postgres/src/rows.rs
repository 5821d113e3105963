//! Row shapes returned by queries and their conversion into domain types.
//!
//! Unknown category or status strings are rejected here.

use chrono::{DateTime, NaiveDate, Utc};
use lakeside_core::{
    Booking, BookingDetails, BookingError, BookingId, BookingStatus, Category, ReservableResource,
    ResourceId, Result, UserId,
};

pub(crate) const RESOURCE_COLUMNS: &str =
    "id, name, category, capacity, weekday_price, weekend_price, description, is_active, sort_order";

pub(crate) const BOOKING_COLUMNS: &str = "id, resource_id, booking_date, user_id, user_name, \
     user_phone, status, created_at, updated_at, moderator_id";

pub(crate) const DETAIL_COLUMNS: &str = "b.id, b.resource_id, b.booking_date, b.user_id, \
     b.user_name, b.user_phone, b.status, b.created_at, b.updated_at, b.moderator_id, \
     r.name AS resource_name, r.category";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ResourceRow {
    id: i64,
    name: String,
    category: String,
    capacity: i32,
    weekday_price: i64,
    weekend_price: i64,
    description: String,
    is_active: bool,
    sort_order: i32,
}

impl TryFrom<ResourceRow> for ReservableResource {
    type Error = BookingError;

    fn try_from(row: ResourceRow) -> Result<Self> {
        Ok(Self {
            id: ResourceId::new(row.id),
            name: row.name,
            category: parse_category(&row.category)?,
            capacity: u32::try_from(row.capacity)
                .map_err(|_| BookingError::Storage(format!("Invalid capacity in row: {}", row.capacity)))?,
            weekday_price: row.weekday_price,
            weekend_price: row.weekend_price,
            description: row.description,
            is_active: row.is_active,
            sort_order: row.sort_order,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BookingRow {
    id: i64,
    resource_id: i64,
    booking_date: NaiveDate,
    user_id: i64,
    user_name: String,
    user_phone: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    moderator_id: Option<i64>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = BookingError;

    fn try_from(row: BookingRow) -> Result<Self> {
        Ok(Self {
            id: BookingId::new(row.id),
            resource_id: ResourceId::new(row.resource_id),
            booking_date: row.booking_date,
            user_id: UserId::new(row.user_id),
            user_name: row.user_name,
            user_phone: row.user_phone,
            status: parse_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            moderator_id: row.moderator_id.map(UserId::new),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct DetailRow {
    #[sqlx(flatten)]
    booking: BookingRow,
    resource_name: String,
    category: String,
}

impl TryFrom<DetailRow> for BookingDetails {
    type Error = BookingError;

    fn try_from(row: DetailRow) -> Result<Self> {
        Ok(Self {
            booking: row.booking.try_into()?,
            resource_name: row.resource_name,
            category: parse_category(&row.category)?,
        })
    }
}

pub(crate) fn parse_status(s: &str) -> Result<BookingStatus> {
    s.parse()
        .map_err(|_| BookingError::Storage(format!("Invalid booking status: {s}")))
}

fn parse_category(s: &str) -> Result<Category> {
    s.parse()
        .map_err(|_| BookingError::Storage(format!("Invalid resource category: {s}")))
}

/// Convert a batch of rows, failing on the first bad one
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = BookingError>,
{
    rows.into_iter().map(T::try_from).collect()
}
