//! Data models for requests, responses and external documents.

/// Booking documents and the reminder time window
pub mod booking;
/// Push notification payloads and results
pub mod notification;
/// Payment-intent request and response types
pub mod payment;
