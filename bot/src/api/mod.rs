//! HTTP surface: health probes, read-only catalog queries and the chat
//! gateway endpoint.

pub mod error;
pub mod handlers;
pub mod health;
pub mod state;

pub use error::AppError;
pub use state::{AppState, ReadinessCheck};

use axum::{
    Router,
    routing::{get, post},
};

/// Build the complete Axum router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/resources", get(handlers::list_resources))
        .route("/resources/:id/calendar", get(handlers::resource_calendar))
        .route("/chat/events", post(handlers::chat_event));

    Router::new()
        // Health checks
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api", api_routes)
        .with_state(state)
}
