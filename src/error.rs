//! Error types and HTTP error response handling.
//!
//! The two endpoints answer errors in different shapes: the payment endpoint
//! returns JSON `{"error": "..."}` bodies, the reminder endpoint returns plain
//! text. Both are produced here from a single [`AppError`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::services::{payment_service::PaymentError, reminder_service::ReminderError};

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Validation Errors**: Required input missing (local check)
/// - **Upstream Errors**: The payment processor or Firebase failed
/// - **Authorization Errors**: Scheduler secret missing or wrong
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request carried no usable `amount`.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Amount is required.")]
    AmountRequired,

    /// The payment processor rejected the request or could not be reached.
    ///
    /// Returns HTTP 500 with the processor's message passed through verbatim.
    #[error("{0}")]
    Payment(#[from] PaymentError),

    /// Bearer secret missing or mismatched.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Unauthorized")]
    Unauthorized,

    /// Reminder dispatch failed somewhere in the batch.
    ///
    /// Returns HTTP 500 with a generic message; details only go to the log.
    #[error("Error sending notifications.")]
    Notifications(#[from] ReminderError),
}

/// Convert AppError into an HTTP response.
///
/// # Status Code Mapping
///
/// - `AmountRequired` → 400, JSON body
/// - `Payment` → 500, JSON body
/// - `Unauthorized` → 401, plain text
/// - `Notifications` → 500, plain text
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::AmountRequired => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            AppError::Payment(ref e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response(),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()).into_response(),
            AppError::Notifications(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            AppError::AmountRequired.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Payment(PaymentError::Api("Invalid currency".to_string()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Notifications(ReminderError::Unavailable)
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn payment_error_text_is_passed_through() {
        let err = AppError::Payment(PaymentError::Api("No such customer".to_string()));

        assert_eq!(err.to_string(), "No such customer");
    }
}
