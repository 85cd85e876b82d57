//! HTTP request handlers (route handlers).
//!
//! Each handler receives request data, calls into the services and maps the
//! result to a response.

pub mod health;
/// Payment-intent endpoint
pub mod payments;
/// Scheduled reminder endpoint
pub mod reminders;
