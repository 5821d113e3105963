//! Application state shared by HTTP handlers.

use crate::app::BookingBot;
use futures::future::BoxFuture;
use lakeside_core::{BookingLedger, ResourceCatalog};
use lakeside_postgres::PostgresBookingStore;
use std::sync::Arc;

/// Dependency probe behind `/ready`
pub trait ReadinessCheck: Send + Sync {
    /// Whether the database answers
    fn database_ready(&self) -> BoxFuture<'_, bool>;
}

impl ReadinessCheck for PostgresBookingStore {
    fn database_ready(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.ping().await.is_ok() })
    }
}

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Inbound chat router
    pub bot: BookingBot,
    /// Catalog for the read-only query surface
    pub catalog: Arc<dyn ResourceCatalog>,
    /// Ledger for the read-only query surface
    pub ledger: Arc<dyn BookingLedger>,
    /// Readiness probe
    pub readiness: Arc<dyn ReadinessCheck>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        bot: BookingBot,
        catalog: Arc<dyn ResourceCatalog>,
        ledger: Arc<dyn BookingLedger>,
        readiness: Arc<dyn ReadinessCheck>,
    ) -> Self {
        Self { bot, catalog, ledger, readiness }
    }
}
