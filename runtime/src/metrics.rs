//! Prometheus metrics for observability and monitoring.
//!
//! This module installs the global recorder, exposes it on an HTTP
//! listener, and describes every metric the booking engine records:
//! - Session store actions and effects
//! - Booking creation and transitions
//! - Notification delivery
//! - Conversation actions
//! - Storage failures
//!
//! # Example
//!
//! ```rust,no_run
//! use lakeside_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Start metrics server on port 9090
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    started: bool,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, started: false }
    }

    /// Address the listener binds to
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Whether the exporter was installed by this server
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Register metric descriptions and start the HTTP listener.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed. An
    /// already-installed recorder is tolerated with a warning.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            // Configure histogram buckets for latency measurements
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install() {
            Ok(()) => {
                register_metrics();
                self.started = true;
                tracing::info!(
                    addr = %self.addr,
                    "Metrics server started - available at http://{}/metrics",
                    self.addr
                );
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    // Session store
    describe_counter!("session_store.actions.total", "Actions applied by session reducers");
    describe_counter!("session_store.effects.executed", "Effects executed, by type");
    describe_counter!("session_store.rejected_actions", "Actions rejected during shutdown");
    describe_counter!("session_store.sessions.evicted", "Sessions dropped by the idle sweep");
    describe_histogram!(
        "session_store.reducer.duration_seconds",
        "Time taken to execute one reducer call"
    );

    // Bookings
    describe_counter!("bookings.created", "Bookings stored as pending");
    describe_counter!("bookings.slot_taken", "Booking attempts rejected because the slot was held");
    describe_counter!("bookings.transitions", "Moderator transitions applied, by transition");

    // Notifications
    describe_counter!("notifications.delivered", "Messages delivered to a recipient");
    describe_counter!("notifications.failed", "Messages that failed to reach a recipient");

    // Conversation
    describe_counter!("conversation.actions", "Conversation actions received, by kind");

    // Storage
    describe_counter!("postgres.query_errors", "Failed PostgreSQL queries, by query");
}
