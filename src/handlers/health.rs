//! Health check endpoint for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: String,

    /// Whether Firebase initialized at startup ("ready" or "unavailable")
    pub reminders: String,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "reminders": "ready",
///   "timestamp": "2026-10-19T19:00:00Z"
/// }
/// ```
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let reminders = if state.reminders.is_some() {
        "ready"
    } else {
        "unavailable"
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        reminders: reminders.to_string(),
        timestamp: Utc::now(),
    })
}
