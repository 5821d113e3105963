//! `ResourceCatalog` over the `resources` table.

use crate::rows::{RESOURCE_COLUMNS, ResourceRow, convert_all};
use crate::{PostgresBookingStore, storage};
use futures::future::BoxFuture;
use lakeside_core::{
    BookingError, Category, ReservableResource, ResourceCatalog, ResourceId, ResourceUpdate, Result,
};

impl ResourceCatalog for PostgresBookingStore {
    fn list_active(
        &self,
        category: Option<Category>,
    ) -> BoxFuture<'_, Result<Vec<ReservableResource>>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {RESOURCE_COLUMNS} FROM resources \
                 WHERE is_active AND ($1::TEXT IS NULL OR category = $1) \
                 ORDER BY sort_order ASC, id ASC"
            );
            let rows: Vec<ResourceRow> = sqlx::query_as(&sql)
                .bind(category.map(Category::as_str))
                .fetch_all(&self.pool)
                .await
                .map_err(storage("list active resources"))?;
            convert_all(rows)
        })
    }

    fn list_all(&self) -> BoxFuture<'_, Result<Vec<ReservableResource>>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {RESOURCE_COLUMNS} FROM resources ORDER BY sort_order ASC, id ASC"
            );
            let rows: Vec<ResourceRow> = sqlx::query_as(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(storage("list resources"))?;
            convert_all(rows)
        })
    }

    fn get_resource(&self, id: ResourceId) -> BoxFuture<'_, Result<ReservableResource>> {
        Box::pin(async move {
            let sql = format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = $1");
            let row: ResourceRow = sqlx::query_as(&sql)
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(storage("get resource"))?
                .ok_or_else(|| BookingError::resource_not_found(id))?;
            row.try_into()
        })
    }

    fn update(
        &self,
        id: ResourceId,
        update: ResourceUpdate,
    ) -> BoxFuture<'_, Result<ReservableResource>> {
        Box::pin(async move {
            update.validate()?;

            let sql = format!(
                "UPDATE resources SET \
                     weekday_price = COALESCE($2, weekday_price), \
                     weekend_price = COALESCE($3, weekend_price), \
                     description = COALESCE($4, description), \
                     sort_order = COALESCE($5, sort_order), \
                     is_active = COALESCE($6, is_active) \
                 WHERE id = $1 \
                 RETURNING {RESOURCE_COLUMNS}"
            );
            let row: ResourceRow = sqlx::query_as(&sql)
                .bind(id.get())
                .bind(update.weekday_price)
                .bind(update.weekend_price)
                .bind(update.description.as_deref())
                .bind(update.sort_order)
                .bind(update.is_active)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage("update resource"))?
                .ok_or_else(|| BookingError::resource_not_found(id))?;

            tracing::info!(resource_id = %id, ?update, "Resource updated");
            row.try_into()
        })
    }
}
