//! Booking reminder HTTP handler.
//!
//! - GET/POST /api/send-reminders - Triggered by the scheduler once a day

use axum::extract::State;
use chrono::Local;

use crate::{
    AppState,
    error::AppError,
    services::reminder_service::{self, ReminderError, ReminderSummary},
};

/// Send push reminders for tomorrow's bookings.
///
/// # Authentication
///
/// Requires `Authorization: Bearer <CRON_SECRET>` (checked by middleware).
///
/// # Response (plain text)
///
/// - **200**: `No bookings for tomorrow.`
/// - **200**: `Sent reminders for N bookings.` where N counts bookings, not
///   delivered notifications
/// - **500**: `Error sending notifications.` if any booking failed
///
/// # Timezone
///
/// "Tomorrow" is computed in the host's local timezone.
pub async fn send_reminders(State(state): State<AppState>) -> Result<String, AppError> {
    let backend = state.reminders.as_ref().ok_or_else(|| {
        tracing::error!("Error sending notifications: Firebase is not initialized");
        AppError::Notifications(ReminderError::Unavailable)
    })?;

    let window = reminder_service::reminder_window(Local::now())?;

    let summary = reminder_service::send_reminders(
        backend.store.as_ref(),
        backend.messenger.as_ref(),
        &window,
    )
    .await
    .inspect_err(|e| tracing::error!(error = %e, "Error sending notifications"))?;

    Ok(match summary {
        ReminderSummary::NoBookings => "No bookings for tomorrow.".to_string(),
        ReminderSummary::Sent { bookings, .. } => format!("Sent reminders for {} bookings.", bookings),
    })
}
