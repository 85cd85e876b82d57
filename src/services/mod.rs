//! Business logic services and upstream API clients.
//!
//! Services contain the logic behind the HTTP handlers. The upstream clients
//! sit behind traits (`PaymentProcessor`, `BookingStore`, `PushMessenger`) so
//! the reminder and payment flows can run against fakes in tests.

/// Firebase credentials and access tokens
pub mod firebase;
/// Firestore booking and token reads
pub mod firestore;
/// Cloud Messaging multicast
pub mod messaging;
/// Payment processor client
pub mod payment_service;
/// Next-day reminder orchestration
pub mod reminder_service;
