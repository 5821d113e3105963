//! Error type for HTTP handlers.
//!
//! Bridges [`BookingError`] and [`BotError`] to HTTP responses through
//! Axum's `IntoResponse`.

use crate::error::BotError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lakeside_core::BookingError;
use lakeside_runtime::StoreError;
use serde::Serialize;
use std::fmt;

/// HTTP-facing error with a status, a stable code and a message
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
}

impl AppError {
    #[must_use]
    const fn new(status: StatusCode, message: String, code: &'static str) -> Self {
        Self { status, message, code }
    }

    /// 400
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "BAD_REQUEST")
    }

    /// 403
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message.into(), "FORBIDDEN")
    }

    /// 404
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message.into(), "NOT_FOUND")
    }

    /// 409
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "CONFLICT")
    }

    /// 422
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message.into(), "VALIDATION_ERROR")
    }

    /// 500
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message.into(), "INTERNAL_SERVER_ERROR")
    }

    /// 503
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message.into(), "SERVICE_UNAVAILABLE")
    }

    /// Response status
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                message = %self.message,
                "Internal server error"
            );
        }

        let body = ErrorResponse { code: self.code, message: self.message };
        (self.status, Json(body)).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match &err {
            BookingError::NotFound(_) => Self::not_found(err.to_string()),
            BookingError::SlotTaken { .. } | BookingError::InvalidTransition { .. } => {
                Self::conflict(err.to_string())
            },
            BookingError::Forbidden { .. } => Self::forbidden(err.to_string()),
            BookingError::Validation(_) => Self::validation(err.to_string()),
            // Storage details stay in the log
            BookingError::Storage(detail) => {
                tracing::error!(error = %detail, "Storage failure behind HTTP request");
                Self::internal("An internal error occurred")
            },
        }
    }
}

impl From<BotError> for AppError {
    fn from(err: BotError) -> Self {
        match err {
            BotError::Session(StoreError::ShutdownInProgress) => {
                Self::unavailable("Service is shutting down")
            },
            BotError::Session(e @ StoreError::FeedbackLimitExceeded(_)) => Self::internal(e.to_string()),
            BotError::Aborted(_) => Self::internal("An internal error occurred"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lakeside_core::{BookingId, BookingStatus, ResourceId, UserId};

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Invalid month");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid month");
    }

    #[test]
    fn test_booking_error_status_mapping() {
        let cases = [
            (BookingError::NotFound("resource 1".to_string()), StatusCode::NOT_FOUND),
            (
                BookingError::SlotTaken {
                    resource_id: ResourceId::new(1),
                    date: NaiveDate::from_ymd_opt(2025, 7, 10).unwrap_or_default(),
                },
                StatusCode::CONFLICT,
            ),
            (
                BookingError::InvalidTransition {
                    booking_id: BookingId::new(1),
                    from: BookingStatus::Cancelled,
                    to: BookingStatus::Confirmed,
                },
                StatusCode::CONFLICT,
            ),
            (BookingError::Forbidden { actor: UserId::new(5) }, StatusCode::FORBIDDEN),
            (BookingError::Validation("bad".to_string()), StatusCode::UNPROCESSABLE_ENTITY),
            (BookingError::Storage("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(AppError::from(error).status(), status);
        }
    }

    #[test]
    fn test_storage_detail_is_hidden() {
        let err = AppError::from(BookingError::Storage("password=secret".to_string()));
        assert!(!err.to_string().contains("secret"));
        assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");
    }

    #[test]
    fn test_shutdown_is_unavailable() {
        let err = AppError::from(BotError::Session(StoreError::ShutdownInProgress));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_aborted_unit_is_internal_and_hides_the_panic() {
        let err = AppError::from(BotError::Aborted("task 7 panicked with 'boom'".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("boom"));
    }
}
