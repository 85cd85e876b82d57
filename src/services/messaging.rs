//! Firebase Cloud Messaging (HTTP v1) client.
//!
//! A multicast is sent as one `messages:send` request per device token, all
//! in flight at once. Per-token failures (unregistered or invalid tokens)
//! end up in the [`BatchResponse`] and do not fail the multicast. Only an
//! invalid message or a failure to authenticate fails the whole call.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use url::Url;

use crate::models::notification::{
    BatchResponse, MAX_MULTICAST_TOKENS, MulticastMessage, Notification, SendResponse,
};
use crate::services::firebase::{FirebaseApp, FirebaseError};
use crate::services::firestore::google_error_message;

/// Something that can deliver a multicast push notification.
#[async_trait]
pub trait PushMessenger: Send + Sync {
    async fn send_each_for_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<BatchResponse, FirebaseError>;
}

/// FCM HTTP v1 client.
#[derive(Clone)]
pub struct FcmClient {
    app: FirebaseApp,
    send_url: Url,
}

#[derive(Debug, Serialize)]
struct FcmRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: &'a Notification,
}

#[derive(Debug, serde::Deserialize)]
struct FcmResponse {
    name: String,
}

impl FcmClient {
    pub fn new(app: FirebaseApp, api_base: &str) -> Result<Self, FirebaseError> {
        let mut send_url = Url::parse(api_base)
            .map_err(|e| FirebaseError::Credentials(format!("Invalid FCM URL: {}", e)))?;
        send_url
            .path_segments_mut()
            .map_err(|_| FirebaseError::Credentials("FCM URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["v1", "projects", app.project_id.as_str(), "messages:send"]);

        Ok(Self { app, send_url })
    }

    async fn send_one(&self, access_token: &str, token: &str, notification: &Notification) -> SendResponse {
        let request = FcmRequest {
            message: FcmMessage {
                token,
                notification,
            },
        };

        let response = match self
            .app
            .client
            .post(self.send_url.clone())
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return SendResponse::failure(token.to_string(), e.to_string()),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return SendResponse::failure(token.to_string(), e.to_string()),
        };

        if !status.is_success() {
            return SendResponse::failure(token.to_string(), google_error_message(&body));
        }

        match serde_json::from_str::<FcmResponse>(&body) {
            Ok(sent) => SendResponse::success(token.to_string(), sent.name),
            Err(e) => SendResponse::failure(token.to_string(), format!("Malformed response: {}", e)),
        }
    }
}

/// Reject messages the messaging service would refuse outright.
pub fn validate_multicast(message: &MulticastMessage) -> Result<(), FirebaseError> {
    if message.tokens.is_empty() {
        return Err(FirebaseError::InvalidMessage(
            "tokens must be a non-empty array".to_string(),
        ));
    }
    if message.tokens.len() > MAX_MULTICAST_TOKENS {
        return Err(FirebaseError::InvalidMessage(format!(
            "tokens list must not contain more than {} items",
            MAX_MULTICAST_TOKENS
        )));
    }
    Ok(())
}

#[async_trait]
impl PushMessenger for FcmClient {
    async fn send_each_for_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<BatchResponse, FirebaseError> {
        validate_multicast(message)?;

        let access_token = self.app.tokens.access_token().await?;

        let responses = join_all(
            message
                .tokens
                .iter()
                .map(|token| self.send_one(&access_token, token, &message.notification)),
        )
        .await;

        let batch = BatchResponse::from(responses);

        tracing::info!(
            success_count = batch.success_count,
            failure_count = batch.failure_count,
            "Multicast sent"
        );

        Ok(batch)
    }
}
