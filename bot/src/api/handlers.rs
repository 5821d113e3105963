//! Read-only catalog queries and the chat gateway endpoint.

use super::error::AppError;
use super::state::AppState;
use crate::app::InboundEvent;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use lakeside_core::availability::month_availability;
use lakeside_core::{Category, PublicDayStatus, ReservableResource, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query string of `GET /api/resources`
#[derive(Debug, Deserialize)]
pub struct ResourceQuery {
    /// Category key or alias (`house`, `fishing`, `site_recreation`, ...)
    pub category: Option<String>,
}

/// Active resources, optionally filtered by category
///
/// # Errors
///
/// 400 for an unknown category, 500 on storage failure.
pub async fn list_resources(
    State(state): State<AppState>,
    Query(query): Query<ResourceQuery>,
) -> Result<Json<Vec<ReservableResource>>, AppError> {
    let category = match query.category.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            Category::from_start_argument(raw)
                .ok_or_else(|| AppError::bad_request(format!("Unknown category '{raw}'")))?,
        ),
    };
    Ok(Json(state.catalog.list_active(category).await?))
}

/// Query string of the calendar endpoint
#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    /// Calendar year
    pub year: i32,
    /// Calendar month, 1-12
    pub month: u32,
}

/// Day-by-day public availability of one active resource.
///
/// Pending days are reported as `partially`.
///
/// # Errors
///
/// 404 for an absent or inactive resource, 422 for an invalid month.
pub async fn resource_calendar(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<BTreeMap<String, PublicDayStatus>>, AppError> {
    let resource_id = ResourceId::new(id);
    let resource = state.catalog.get_resource(resource_id).await?;
    if !resource.is_active {
        return Err(AppError::not_found(format!("resource {resource_id}")));
    }

    let view = month_availability(state.ledger.as_ref(), resource_id, query.year, query.month).await?;
    Ok(Json(view.public_view()))
}

/// Acknowledgement of an accepted chat event
#[derive(Debug, Serialize)]
pub struct Accepted {
    /// Always `accepted`
    pub status: &'static str,
}

/// Inbound chat events from the transport gateway.
///
/// Replies travel back through the chat transport, not this response.
///
/// # Errors
///
/// 503 while shutting down.
pub async fn chat_event(
    State(state): State<AppState>,
    Json(event): Json<InboundEvent>,
) -> Result<(StatusCode, Json<Accepted>), AppError> {
    state.bot.handle(event).await?;
    Ok((StatusCode::ACCEPTED, Json(Accepted { status: "accepted" })))
}
