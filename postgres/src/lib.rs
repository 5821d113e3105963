//! `PostgreSQL` catalog and booking ledger for the Lakeside booking engine.
//!
//! [`PostgresBookingStore`] implements both `ResourceCatalog` and
//! `BookingLedger` from `lakeside-core` on top of a sqlx connection pool:
//!
//! - Embedded migrations (`migrations/`)
//! - One-active-booking-per-slot enforced by a partial unique index; a
//!   unique violation on insert is reported as `SlotTaken`
//! - Status transitions scoped by the required current status, with the
//!   affected-row count checked
//! - Default catalog seeding for an empty database
//!
//! # Example
//!
//! ```ignore
//! use lakeside_postgres::{PoolSettings, PostgresBookingStore, connect};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = connect("postgres://localhost/lakeside", PoolSettings::default()).await?;
//!     let store = PostgresBookingStore::new(pool, Arc::new(SystemClock));
//!     store.migrate().await?;
//!     store.seed_if_empty().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod ledger;
mod rows;

use lakeside_core::environment::Clock;
use lakeside_core::types::default_catalog;
use lakeside_core::{BookingError, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

/// Catalog and ledger backed by `PostgreSQL`.
///
/// Cloning shares the connection pool.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PostgresBookingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBookingStore").finish_non_exhaustive()
    }
}

/// Connection pool sizing and timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections kept open
    pub min_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
    /// Connections idle longer than this are closed
    pub idle_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`BookingError::Storage`] if the database cannot be reached.
pub async fn connect(database_url: &str, settings: PoolSettings) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
        .idle_timeout(settings.idle_timeout)
        .connect(database_url)
        .await
        .map_err(|e| BookingError::Storage(format!("Failed to connect: {e}")))
}

impl PostgresBookingStore {
    /// Create a store over an existing pool.
    ///
    /// `clock` stamps `created_at` and `updated_at`.
    #[must_use]
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| BookingError::Storage(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Verify the database answers queries.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] if the query fails.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(storage("ping"))?;
        Ok(())
    }

    /// Insert the default catalog if no resource exists yet.
    ///
    /// Returns the number of inserted resources.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] if a query fails.
    pub async fn seed_if_empty(&self) -> Result<usize> {
        let mut tx = self.pool.begin().await.map_err(storage("begin seed"))?;

        // Serialize concurrent seeders
        sqlx::query("LOCK TABLE resources IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(storage("lock resources"))?;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM resources")
            .fetch_one(&mut *tx)
            .await
            .map_err(storage("count resources"))?;

        if count > 0 {
            tracing::debug!(existing = count, "Catalog already seeded");
            return Ok(0);
        }

        let catalog = default_catalog();
        for resource in &catalog {
            resource.validate()?;
            let capacity = i32::try_from(resource.capacity)
                .map_err(|_| BookingError::Validation("capacity out of range".to_string()))?;
            sqlx::query(
                r"
                INSERT INTO resources
                    (name, category, capacity, weekday_price, weekend_price, description, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(&resource.name)
            .bind(resource.category.as_str())
            .bind(capacity)
            .bind(resource.weekday_price)
            .bind(resource.weekend_price)
            .bind(&resource.description)
            .bind(resource.sort_order)
            .execute(&mut *tx)
            .await
            .map_err(storage("seed resource"))?;
        }

        tx.commit().await.map_err(storage("commit seed"))?;
        tracing::info!(resources = catalog.len(), "Seeded default catalog");
        Ok(catalog.len())
    }
}

/// Map a sqlx error to [`BookingError::Storage`] with context.
fn storage(context: &'static str) -> impl FnOnce(sqlx::Error) -> BookingError {
    move |e| {
        tracing::error!(error = %e, context, "Database query failed");
        metrics::counter!("postgres.query_errors", "query" => context).increment(1);
        BookingError::Storage(format!("Failed to {context}: {e}"))
    }
}
