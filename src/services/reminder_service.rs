//! Next-day booking reminders.
//!
//! # Process
//!
//! 1. Compute tomorrow's window in the caller's timezone
//! 2. Query bookings in that window
//! 3. For every booking at once: look up the user's device tokens and, if
//!    there are any, send one multicast reminder
//! 4. Wait for every booking to finish, then succeed only if all succeeded
//!
//! Each booking's outcome is captured separately so callers can inspect
//! partial results, but the batch as a whole is all-or-nothing.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use futures::future::join_all;

use crate::models::booking::{Booking, ReminderWindow};
use crate::models::notification::{BatchResponse, MulticastMessage, Notification};
use crate::services::firebase::FirebaseError;
use crate::services::firestore::BookingStore;
use crate::services::messaging::PushMessenger;

pub const REMINDER_TITLE: &str = "Your Adventure Awaits! ⛰️";

/// Used when a booking has no attraction name.
const FALLBACK_ATTRACTION: &str = "your attraction";

/// Errors that fail a whole reminder run.
#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    /// Firebase was not initialized at startup
    #[error("Firebase is not initialized")]
    Unavailable,

    #[error("Could not compute the reminder window")]
    InvalidWindow,

    #[error("Booking query failed: {0}")]
    Query(#[from] FirebaseError),

    /// At least one booking's lookup or dispatch failed
    #[error("{failed} of {total} booking reminders failed")]
    Dispatch { failed: usize, total: usize },
}

/// Why a single booking's reminder failed.
#[derive(Debug, thiserror::Error)]
pub enum BookingReminderError {
    #[error("booking has no userId")]
    MissingUserId,

    #[error("token lookup failed: {0}")]
    TokenLookup(FirebaseError),

    #[error("dispatch failed: {0}")]
    Dispatch(FirebaseError),
}

/// Successful outcome for one booking.
#[derive(Debug)]
pub enum ReminderOutcome {
    Sent(BatchResponse),

    /// User has no registered devices; nothing was sent
    NoTokens,
}

/// Captured result of one booking's reminder unit.
#[derive(Debug)]
pub struct BookingReminder {
    pub booking_id: String,
    pub outcome: Result<ReminderOutcome, BookingReminderError>,
}

/// Result of a successful reminder run.
#[derive(Debug)]
pub enum ReminderSummary {
    NoBookings,

    /// `bookings` counts bookings processed, including those without tokens
    Sent {
        bookings: usize,
        outcomes: Vec<BookingReminder>,
    },
}

/// Tomorrow's calendar day in `now`'s timezone, as a UTC window.
///
/// Start is local midnight of tomorrow (inclusive), end is local midnight of
/// the day after (exclusive). The window is usually 24 hours long, but 23 or
/// 25 across a DST change.
pub fn reminder_window<Tz: TimeZone>(now: DateTime<Tz>) -> Result<ReminderWindow, ReminderError> {
    let tz = now.timezone();
    let today = now.date_naive();

    let tomorrow = today
        .checked_add_days(Days::new(1))
        .ok_or(ReminderError::InvalidWindow)?;
    let day_after = today
        .checked_add_days(Days::new(2))
        .ok_or(ReminderError::InvalidWindow)?;

    Ok(ReminderWindow {
        start: start_of_day(&tz, tomorrow).ok_or(ReminderError::InvalidWindow)?,
        end: start_of_day(&tz, day_after).ok_or(ReminderError::InvalidWindow)?,
    })
}

/// First valid local instant of `date`.
///
/// Midnight can be skipped by a DST jump in some zones, so later hours are
/// tried until one exists.
fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    (0..24).find_map(|hour| {
        let local = date.and_hms_opt(hour, 0, 0)?;
        tz.from_local_datetime(&local)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
    })
}

/// Build the reminder addressed to all of a user's devices.
pub fn reminder_message(booking: &Booking, tokens: Vec<String>) -> MulticastMessage {
    let attraction = booking
        .attraction_name
        .as_deref()
        .unwrap_or(FALLBACK_ATTRACTION);

    MulticastMessage {
        notification: Notification {
            title: REMINDER_TITLE.to_string(),
            body: format!("Your trip to {} is tomorrow. Get ready!", attraction),
        },
        tokens,
    }
}

async fn remind_booking(
    store: &dyn BookingStore,
    messenger: &dyn PushMessenger,
    booking: &Booking,
) -> Result<ReminderOutcome, BookingReminderError> {
    let user_id = booking
        .user_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(BookingReminderError::MissingUserId)?;

    let tokens = store
        .device_tokens(user_id)
        .await
        .map_err(BookingReminderError::TokenLookup)?;

    if tokens.is_empty() {
        return Ok(ReminderOutcome::NoTokens);
    }

    let message = reminder_message(booking, tokens);

    messenger
        .send_each_for_multicast(&message)
        .await
        .map(ReminderOutcome::Sent)
        .map_err(BookingReminderError::Dispatch)
}

/// Send reminders for every booking in `window`.
///
/// # Errors
///
/// - `Query`: the booking query failed, nothing was sent
/// - `Dispatch`: one or more bookings failed; the others may have been sent
pub async fn send_reminders(
    store: &dyn BookingStore,
    messenger: &dyn PushMessenger,
    window: &ReminderWindow,
) -> Result<ReminderSummary, ReminderError> {
    let bookings = store.bookings_between(window).await?;

    if bookings.is_empty() {
        tracing::info!(start = %window.start, end = %window.end, "No bookings for tomorrow");
        return Ok(ReminderSummary::NoBookings);
    }

    let results: Vec<BookingReminder> = join_all(bookings.iter().map(|booking| async move {
        BookingReminder {
            booking_id: booking.id.clone(),
            outcome: remind_booking(store, messenger, booking).await,
        }
    }))
    .await;

    let mut failed = 0;
    for result in &results {
        match &result.outcome {
            Ok(ReminderOutcome::Sent(batch)) => tracing::info!(
                booking_id = %result.booking_id,
                success_count = batch.success_count,
                failure_count = batch.failure_count,
                "Reminder sent"
            ),
            Ok(ReminderOutcome::NoTokens) => tracing::debug!(
                booking_id = %result.booking_id,
                "No device tokens, reminder skipped"
            ),
            Err(e) => {
                failed += 1;
                tracing::error!(booking_id = %result.booking_id, error = %e, "Reminder failed");
            }
        }
    }

    if failed > 0 {
        return Err(ReminderError::Dispatch {
            failed,
            total: results.len(),
        });
    }

    Ok(ReminderSummary::Sent {
        bookings: bookings.len(),
        outcomes: results,
    })
}
