//! Push notification payloads and delivery results.
//!
//! `MulticastMessage` is one notification addressed to many device tokens.
//! Sending it yields a `BatchResponse` with one `SendResponse` per token, in
//! the same order as the tokens.

use serde::Serialize;

/// Largest token list accepted in one multicast.
pub const MAX_MULTICAST_TOKENS: usize = 500;

/// Visible part of a push notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// One notification addressed to all of a user's devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticastMessage {
    pub notification: Notification,
    pub tokens: Vec<String>,
}

/// Result of sending to a single device token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendResponse {
    pub token: String,

    /// Message name assigned by the messaging service on success
    pub message_id: Option<String>,

    /// Error text on failure (e.g. unregistered token)
    pub error: Option<String>,
}

impl SendResponse {
    pub fn success(token: String, message_id: String) -> Self {
        Self {
            token,
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn failure(token: String, error: String) -> Self {
        Self {
            token,
            message_id: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-token outcome of a multicast send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResponse {
    pub responses: Vec<SendResponse>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl From<Vec<SendResponse>> for BatchResponse {
    fn from(responses: Vec<SendResponse>) -> Self {
        let success_count = responses.iter().filter(|r| r.is_success()).count();
        let failure_count = responses.len() - success_count;

        Self {
            responses,
            success_count,
            failure_count,
        }
    }
}
