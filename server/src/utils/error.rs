use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::booking::BookingError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Booking(#[from] BookingError),
}

impl AppError {
    pub fn forbidden() -> Self {
        AppError::Forbidden("You don't have permission to access this resource".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Booking(err) => match err {
                BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
                BookingError::OutOfStock(_)
                | BookingError::EventNotBookable { .. }
                | BookingError::InvalidTransition { .. }
                | BookingError::DuplicateName(_) => StatusCode::CONFLICT,
                BookingError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
                BookingError::StoreFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Booking(err) => match err {
                BookingError::NotFound { .. } => "NOT_FOUND",
                BookingError::OutOfStock(_) => "OUT_OF_STOCK",
                BookingError::EventNotBookable { .. } => "EVENT_NOT_BOOKABLE",
                BookingError::InvalidTransition { .. } => "INVALID_TRANSITION",
                BookingError::DuplicateName(_) => "DUPLICATE_NAME",
                BookingError::ValidationFailed(_) => "VALIDATION_ERROR",
                BookingError::StoreFailure(_) => "STORE_FAILURE",
            },
        }
    }

    fn log(&self) {
        match self {
            AppError::Booking(BookingError::StoreFailure(e)) => {
                error!(error = ?e, "Store failure");
            }
            _ => {
                warn!(code = self.code(), message = %self, "Request rejected");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        let public_message = match &self {
            AppError::Booking(BookingError::StoreFailure(_)) => {
                "The store is temporarily unavailable, please retry".to_string()
            }
            other => other.to_string(),
        };

        let details = match &self {
            AppError::Booking(BookingError::InvalidTransition { from, to, .. }) => {
                Some(json!({ "from": from, "to": to }))
            }
            _ => None,
        };

        error_response(code, public_message, details, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_booking_errors_map_to_stable_codes() {
        let cases = [
            (
                AppError::from(BookingError::OutOfStock(Uuid::nil())),
                StatusCode::CONFLICT,
                "OUT_OF_STOCK",
            ),
            (
                AppError::from(BookingError::not_found("event", Uuid::nil())),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                AppError::from(BookingError::invalid_transition("event", "Cancelled", "Active")),
                StatusCode::CONFLICT,
                "INVALID_TRANSITION",
            ),
            (
                AppError::from(BookingError::validation("bad")),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                AppError::from(BookingError::StoreFailure(sqlx::Error::PoolTimedOut)),
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_FAILURE",
            ),
        ];

        for (error, status, code) in cases {
            assert_eq!(error.status_code(), status);
            assert_eq!(error.code(), code);
        }
    }

    #[test]
    fn test_store_failure_hides_driver_text() {
        let response =
            AppError::from(BookingError::StoreFailure(sqlx::Error::PoolTimedOut)).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
