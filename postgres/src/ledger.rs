//! `BookingLedger` over the `bookings` table.

use crate::rows::{BOOKING_COLUMNS, BookingRow, DETAIL_COLUMNS, DetailRow, convert_all, parse_status};
use crate::{PostgresBookingStore, storage};
use chrono::NaiveDate;
use futures::future::BoxFuture;
use lakeside_core::availability::month_bounds;
use lakeside_core::{
    Booking, BookingDetails, BookingError, BookingId, BookingLedger, NewBooking, ResourceId,
    Result, Transition, UserId,
};

const DETAIL_FROM: &str = "FROM bookings b JOIN resources r ON r.id = b.resource_id";

impl BookingLedger for PostgresBookingStore {
    fn create_booking(&self, booking: NewBooking) -> BoxFuture<'_, Result<BookingId>> {
        Box::pin(async move {
            let now = self.clock.now();

            // The partial unique index rejects a second active booking for the slot
            let inserted: Option<(i64,)> = sqlx::query_as(
                r"
                INSERT INTO bookings
                    (resource_id, booking_date, user_id, user_name, user_phone, status, created_at, updated_at)
                SELECT id, $2, $3, $4, $5, 'pending', $6, $6
                FROM resources
                WHERE id = $1 AND is_active
                RETURNING id
                ",
            )
            .bind(booking.resource_id.get())
            .bind(booking.date)
            .bind(booking.requester.get())
            .bind(&booking.name)
            .bind(&booking.phone)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        tracing::info!(
                            resource_id = %booking.resource_id,
                            date = %booking.date,
                            "Slot already taken"
                        );
                        return BookingError::SlotTaken {
                            resource_id: booking.resource_id,
                            date: booking.date,
                        };
                    }
                }
                storage("insert booking")(e)
            })?;

            let (id,) = inserted.ok_or_else(|| BookingError::resource_not_found(booking.resource_id))?;
            let id = BookingId::new(id);

            tracing::info!(
                booking_id = %id,
                resource_id = %booking.resource_id,
                date = %booking.date,
                requester = %booking.requester,
                "Booking stored"
            );
            Ok(id)
        })
    }

    fn transition(
        &self,
        id: BookingId,
        transition: Transition,
        moderator: UserId,
    ) -> BoxFuture<'_, Result<Booking>> {
        Box::pin(async move {
            let now = self.clock.now();
            let sql = format!(
                "UPDATE bookings SET status = $3, moderator_id = $4, updated_at = $5 \
                 WHERE id = $1 AND status = $2 \
                 RETURNING {BOOKING_COLUMNS}"
            );
            let updated: Option<BookingRow> = sqlx::query_as(&sql)
                .bind(id.get())
                .bind(transition.required_from().as_str())
                .bind(transition.target().as_str())
                .bind(moderator.get())
                .bind(now)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage("update booking status"))?;

            if let Some(row) = updated {
                return row.try_into();
            }

            // Zero rows: either no such booking or it is in another status
            let current: Option<(String,)> =
                sqlx::query_as("SELECT status FROM bookings WHERE id = $1")
                    .bind(id.get())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(storage("read booking status"))?;

            match current {
                None => Err(BookingError::booking_not_found(id)),
                Some((status,)) => Err(BookingError::InvalidTransition {
                    booking_id: id,
                    from: parse_status(&status)?,
                    to: transition.target(),
                }),
            }
        })
    }

    fn get(&self, id: BookingId) -> BoxFuture<'_, Result<Booking>> {
        Box::pin(async move {
            let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
            let row: BookingRow = sqlx::query_as(&sql)
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(storage("get booking"))?
                .ok_or_else(|| BookingError::booking_not_found(id))?;
            row.try_into()
        })
    }

    fn get_details(&self, id: BookingId) -> BoxFuture<'_, Result<BookingDetails>> {
        Box::pin(async move {
            let sql = format!("SELECT {DETAIL_COLUMNS} {DETAIL_FROM} WHERE b.id = $1");
            let row: DetailRow = sqlx::query_as(&sql)
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(storage("get booking details"))?
                .ok_or_else(|| BookingError::booking_not_found(id))?;
            row.try_into()
        })
    }

    fn list_pending(&self) -> BoxFuture<'_, Result<Vec<BookingDetails>>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {DETAIL_COLUMNS} {DETAIL_FROM} \
                 WHERE b.status = 'pending' \
                 ORDER BY b.created_at ASC, b.id ASC"
            );
            let rows: Vec<DetailRow> = sqlx::query_as(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(storage("list pending bookings"))?;
            convert_all(rows)
        })
    }

    fn list_for_resource_month(
        &self,
        resource_id: ResourceId,
        year: i32,
        month: u32,
    ) -> BoxFuture<'_, Result<Vec<Booking>>> {
        Box::pin(async move {
            let (first, next) = month_bounds(year, month)?;
            let sql = format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings \
                 WHERE resource_id = $1 AND status <> 'cancelled' \
                   AND booking_date >= $2 AND booking_date < $3 \
                 ORDER BY booking_date ASC, id ASC"
            );
            let rows: Vec<BookingRow> = sqlx::query_as(&sql)
                .bind(resource_id.get())
                .bind(first)
                .bind(next)
                .fetch_all(&self.pool)
                .await
                .map_err(storage("list bookings for month"))?;
            convert_all(rows)
        })
    }

    fn list_for_date(&self, date: NaiveDate) -> BoxFuture<'_, Result<Vec<BookingDetails>>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {DETAIL_COLUMNS} {DETAIL_FROM} \
                 WHERE b.booking_date = $1 AND b.status <> 'cancelled' \
                 ORDER BY r.sort_order ASC, r.id ASC, b.id ASC"
            );
            let rows: Vec<DetailRow> = sqlx::query_as(&sql)
                .bind(date)
                .fetch_all(&self.pool)
                .await
                .map_err(storage("list bookings for date"))?;
            convert_all(rows)
        })
    }
}
