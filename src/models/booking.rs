//! Booking records read from the document store.
//!
//! Bookings are owned by the mobile app; this service only reads them to
//! decide who gets a reminder.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A booking document from the `bookings` collection.
///
/// # Document Fields
///
/// - `bookingTimestamp`: When the trip takes place
/// - `userId`: Owner of the booking, key into `users/{userId}/tokens`
/// - `attractionName`: Shown in the reminder text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    /// Document ID (last path segment of the document name)
    pub id: String,

    pub booking_timestamp: Option<DateTime<Utc>>,

    /// Missing on malformed documents; such bookings fail their dispatch unit
    pub user_id: Option<String>,

    pub attraction_name: Option<String>,
}

/// Half-open time range `[start, end)` used to select bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReminderWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}
