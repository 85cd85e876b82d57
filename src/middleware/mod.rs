//! HTTP middleware components.

/// Scheduler bearer-secret check
pub mod cron_auth;
