//! Per-day availability of a resource over a calendar month.
//!
//! [`compute_month`] is a pure function over a booking slice. Precedence is
//! `booked > pending > available` no matter how many bookings share a day,
//! so the view stays consistent even if storage ever held duplicates.
//! [`month_availability`] is the thin async wrapper that reads the ledger.

use crate::error::{BookingError, Result};
use crate::ledger::BookingLedger;
use crate::types::{Booking, BookingStatus, ResourceId};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Internal status of one day
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayAvailability {
    /// No active booking
    Available,
    /// A booking is waiting for a moderator
    Pending,
    /// A booking is confirmed
    Booked,
}

/// Status of one day as reported to external clients
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicDayStatus {
    /// Free
    Available,
    /// Requested but not yet confirmed
    Partially,
    /// Taken
    Booked,
}

impl From<DayAvailability> for PublicDayStatus {
    fn from(day: DayAvailability) -> Self {
        match day {
            DayAvailability::Available => Self::Available,
            DayAvailability::Pending => Self::Partially,
            DayAvailability::Booked => Self::Booked,
        }
    }
}

/// First day of the month and first day of the following month.
///
/// # Errors
///
/// Returns [`BookingError::Validation`] for a month outside `1..=12` or a
/// year chrono cannot represent.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let invalid = || BookingError::Validation(format!("invalid month {year}-{month:02}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    Ok((first, next))
}

/// Number of days in a month
///
/// # Errors
///
/// Returns [`BookingError::Validation`] for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> Result<u32> {
    let (first, next) = month_bounds(year, month)?;
    let days = next.signed_duration_since(first).num_days();
    u32::try_from(days).map_err(|_| BookingError::Validation(format!("invalid month {year}-{month:02}")))
}

/// Availability of one resource for every day of a month
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthAvailability {
    /// Resource the view describes
    pub resource_id: ResourceId,
    /// Year
    pub year: i32,
    /// Month, `1..=12`
    pub month: u32,
    days: BTreeMap<NaiveDate, DayAvailability>,
}

impl MonthAvailability {
    /// Status of one day, `None` if the date is outside the month
    #[must_use]
    pub fn status(&self, date: NaiveDate) -> Option<DayAvailability> {
        self.days.get(&date).copied()
    }

    /// Days in date order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, DayAvailability)> + '_ {
        self.days.iter().map(|(d, s)| (*d, *s))
    }

    /// The underlying ordered map
    #[must_use]
    pub const fn days(&self) -> &BTreeMap<NaiveDate, DayAvailability> {
        &self.days
    }

    /// Number of days in the view
    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// Whether the view has no days
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Number of days with the given status
    #[must_use]
    pub fn count(&self, status: DayAvailability) -> usize {
        self.days.values().filter(|s| **s == status).count()
    }

    /// The external view: ISO date → `available` / `partially` / `booked`
    #[must_use]
    pub fn public_view(&self) -> BTreeMap<String, PublicDayStatus> {
        self.days
            .iter()
            .map(|(date, status)| (date.format("%Y-%m-%d").to_string(), (*status).into()))
            .collect()
    }
}

/// Computes the month view from bookings.
///
/// Bookings for other resources, outside the month, or cancelled are ignored.
///
/// # Errors
///
/// Returns [`BookingError::Validation`] for an invalid month.
pub fn compute_month(
    resource_id: ResourceId,
    year: i32,
    month: u32,
    bookings: &[Booking],
) -> Result<MonthAvailability> {
    let (first, next) = month_bounds(year, month)?;

    let mut days: BTreeMap<NaiveDate, DayAvailability> = first
        .iter_days()
        .take_while(|d| *d < next)
        .map(|d| (d, DayAvailability::Available))
        .collect();

    for booking in bookings {
        if booking.resource_id != resource_id {
            continue;
        }
        let marked = match booking.status {
            BookingStatus::Confirmed => DayAvailability::Booked,
            BookingStatus::Pending => DayAvailability::Pending,
            BookingStatus::Cancelled => continue,
        };
        if let Some(day) = days.get_mut(&booking.booking_date) {
            // Variant order encodes precedence
            if marked > *day {
                *day = marked;
            }
        }
    }

    debug_assert!(days.keys().all(|d| d.year() == year && d.month() == month));

    Ok(MonthAvailability { resource_id, year, month, days })
}

/// Reads the ledger and computes the month view.
///
/// # Errors
///
/// Propagates ledger errors and returns [`BookingError::Validation`] for an
/// invalid month.
pub async fn month_availability(
    ledger: &dyn BookingLedger,
    resource_id: ResourceId,
    year: i32,
    month: u32,
) -> Result<MonthAvailability> {
    month_bounds(year, month)?;
    let bookings = ledger.list_for_resource_month(resource_id, year, month).await?;
    compute_month(resource_id, year, month, &bookings)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{BookingId, UserId};
    use chrono::Utc;
    use proptest::prelude::*;

    fn booking(id: i64, resource: i64, date: NaiveDate, status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: BookingId::new(id),
            resource_id: ResourceId::new(resource),
            booking_date: date,
            user_id: UserId::new(100 + id),
            user_name: "Guest".to_string(),
            user_phone: "79000000000".to_string(),
            status,
            created_at: now,
            updated_at: now,
            moderator_id: None,
        }
    }

    fn june(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    #[test]
    fn confirmed_and_pending_in_thirty_day_month() {
        let bookings = vec![
            booking(1, 1, june(5), BookingStatus::Confirmed),
            booking(2, 1, june(12), BookingStatus::Pending),
        ];

        let view = compute_month(ResourceId::new(1), 2025, 6, &bookings).unwrap();

        assert_eq!(view.len(), 30);
        assert_eq!(view.status(june(5)), Some(DayAvailability::Booked));
        assert_eq!(view.status(june(12)), Some(DayAvailability::Pending));
        assert_eq!(view.count(DayAvailability::Available), 28);
    }

    #[test]
    fn ignores_other_resources_months_and_cancelled() {
        let july_first = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let bookings = vec![
            booking(1, 2, june(5), BookingStatus::Confirmed),
            booking(2, 1, july_first, BookingStatus::Confirmed),
            booking(3, 1, june(9), BookingStatus::Cancelled),
        ];

        let view = compute_month(ResourceId::new(1), 2025, 6, &bookings).unwrap();

        assert_eq!(view.count(DayAvailability::Available), 30);
        assert_eq!(view.status(july_first), None);
    }

    #[test]
    fn booked_wins_over_pending_regardless_of_order() {
        let bookings = vec![
            booking(1, 1, june(3), BookingStatus::Confirmed),
            booking(2, 1, june(3), BookingStatus::Pending),
        ];
        let reversed: Vec<_> = bookings.iter().rev().cloned().collect();

        for slice in [bookings, reversed] {
            let view = compute_month(ResourceId::new(1), 2025, 6, &slice).unwrap();
            assert_eq!(view.status(june(3)), Some(DayAvailability::Booked));
        }
    }

    #[test]
    fn public_view_reports_pending_as_partially() {
        let bookings = vec![booking(1, 1, june(12), BookingStatus::Pending)];
        let view = compute_month(ResourceId::new(1), 2025, 6, &bookings).unwrap();
        let public = view.public_view();

        assert_eq!(public.get("2025-06-12"), Some(&PublicDayStatus::Partially));
        assert_eq!(public.get("2025-06-13"), Some(&PublicDayStatus::Available));
        assert_eq!(
            serde_json::to_value(&public).unwrap()["2025-06-12"],
            serde_json::json!("partially")
        );
    }

    #[test]
    fn invalid_month_is_validation_error() {
        assert!(matches!(
            compute_month(ResourceId::new(1), 2025, 13, &[]),
            Err(BookingError::Validation(_))
        ));
        assert!(matches!(days_in_month(2025, 0), Err(BookingError::Validation(_))));
    }

    #[test]
    fn leap_february() {
        assert_eq!(days_in_month(2024, 2).unwrap(), 29);
        assert_eq!(days_in_month(2025, 2).unwrap(), 28);
        assert_eq!(days_in_month(2025, 12).unwrap(), 31);
    }

    fn status_strategy() -> impl Strategy<Value = BookingStatus> {
        prop_oneof![
            Just(BookingStatus::Pending),
            Just(BookingStatus::Confirmed),
            Just(BookingStatus::Cancelled),
        ]
    }

    proptest! {
        #[test]
        fn precedence_holds_for_any_booking_set(
            entries in prop::collection::vec((1u32..=30, 1i64..=3, status_strategy()), 0..40)
        ) {
            let bookings: Vec<Booking> = entries
                .iter()
                .enumerate()
                .map(|(i, (day, res, status))| {
                    booking(i64::try_from(i).unwrap(), *res, june(*day), *status)
                })
                .collect();

            let view = compute_month(ResourceId::new(1), 2025, 6, &bookings).unwrap();
            prop_assert_eq!(view.len(), 30);

            for (date, status) in view.iter() {
                let on_day: Vec<_> = bookings
                    .iter()
                    .filter(|b| b.resource_id == ResourceId::new(1) && b.booking_date == date)
                    .collect();
                let expected = if on_day.iter().any(|b| b.status == BookingStatus::Confirmed) {
                    DayAvailability::Booked
                } else if on_day.iter().any(|b| b.status == BookingStatus::Pending) {
                    DayAvailability::Pending
                } else {
                    DayAvailability::Available
                };
                prop_assert_eq!(status, expected);
            }
        }

        #[test]
        fn every_valid_month_has_its_length(year in 1970i32..2100, month in 1u32..=12) {
            let view = compute_month(ResourceId::new(1), year, month, &[]).unwrap();
            prop_assert_eq!(view.len(), days_in_month(year, month).unwrap() as usize);
            prop_assert!(view.iter().all(|(d, _)| d.month() == month && d.year() == year));
        }
    }
}
