//! Cloud Firestore access over the REST API.
//!
//! Two reads are needed:
//! - bookings whose `bookingTimestamp` falls in a window (`documents:runQuery`)
//! - the device tokens under `users/{userId}/tokens` (collection listing)
//!
//! Firestore returns typed values (`{"stringValue": "..."}`); only the types
//! used by booking documents are decoded.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::models::booking::{Booking, ReminderWindow};
use crate::services::firebase::{FirebaseApp, FirebaseError};

const BOOKINGS_COLLECTION: &str = "bookings";
const USERS_COLLECTION: &str = "users";
const TOKENS_COLLECTION: &str = "tokens";
const TOKENS_PAGE_SIZE: &str = "300";

/// Read access to bookings and device tokens.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Bookings with `window.start <= bookingTimestamp < window.end`.
    async fn bookings_between(&self, window: &ReminderWindow)
    -> Result<Vec<Booking>, FirebaseError>;

    /// Document IDs of `users/{user_id}/tokens`; empty if the user has none.
    async fn device_tokens(&self, user_id: &str) -> Result<Vec<String>, FirebaseError>;
}

/// Firestore REST client for the `(default)` database.
#[derive(Clone)]
pub struct FirestoreClient {
    app: FirebaseApp,
    api_base: Url,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

impl Document {
    fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    fn string_field(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)?
            .get("stringValue")?
            .as_str()
            .map(str::to_string)
    }

    fn timestamp_field(&self, key: &str) -> Option<DateTime<Utc>> {
        let raw = self.fields.get(key)?.get("timestampValue")?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

impl From<Document> for Booking {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id().to_string(),
            booking_timestamp: doc.timestamp_field("bookingTimestamp"),
            user_id: doc.string_field("userId"),
            attraction_name: doc.string_field("attractionName"),
        }
    }
}

/// One element of the `runQuery` response stream.
#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    message: String,
}

impl FirestoreClient {
    pub fn new(app: FirebaseApp, api_base: &str) -> Result<Self, FirebaseError> {
        let api_base = Url::parse(api_base)
            .map_err(|e| FirebaseError::Credentials(format!("Invalid Firestore URL: {}", e)))?;

        Ok(Self { app, api_base })
    }

    /// `{base}/v1/projects/{project}/databases/(default)/documents/<segments...>`
    fn documents_url(&self, segments: &[&str]) -> Result<Url, FirebaseError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| FirebaseError::Credentials("Firestore URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                self.app.project_id.as_str(),
                "databases",
                "(default)",
            ])
            .extend(segments);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<String, FirebaseError> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        Err(FirebaseError::Api {
            status: status.as_u16(),
            message: google_error_message(&body),
        })
    }
}

/// Extract `error.message` from a Google API error body.
///
/// `runQuery` wraps errors in a one-element array, other calls do not.
pub(crate) fn google_error_message(body: &str) -> String {
    if let Ok(GoogleErrorBody { error }) = serde_json::from_str(body) {
        return error.message;
    }
    if let Ok(mut errors) = serde_json::from_str::<Vec<GoogleErrorBody>>(body) {
        if !errors.is_empty() {
            return errors.swap_remove(0).error.message;
        }
    }
    body.to_string()
}

fn timestamp_value(instant: DateTime<Utc>) -> Value {
    json!({ "timestampValue": instant.to_rfc3339_opts(SecondsFormat::Micros, true) })
}

#[async_trait]
impl BookingStore for FirestoreClient {
    async fn bookings_between(
        &self,
        window: &ReminderWindow,
    ) -> Result<Vec<Booking>, FirebaseError> {
        let url = self.documents_url(&["documents:runQuery"])?;

        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": BOOKINGS_COLLECTION }],
                "where": {
                    "compositeFilter": {
                        "op": "AND",
                        "filters": [
                            {
                                "fieldFilter": {
                                    "field": { "fieldPath": "bookingTimestamp" },
                                    "op": "GREATER_THAN_OR_EQUAL",
                                    "value": timestamp_value(window.start)
                                }
                            },
                            {
                                "fieldFilter": {
                                    "field": { "fieldPath": "bookingTimestamp" },
                                    "op": "LESS_THAN",
                                    "value": timestamp_value(window.end)
                                }
                            }
                        ]
                    }
                }
            }
        });

        let token = self.app.tokens.access_token().await?;
        let response = self
            .app
            .client
            .post(url)
            .bearer_auth(token)
            .json(&query)
            .send()
            .await?;
        let body = Self::check(response).await?;

        let items: Vec<RunQueryItem> =
            serde_json::from_str(&body).map_err(|e| FirebaseError::Decode(e.to_string()))?;

        let bookings: Vec<Booking> = items
            .into_iter()
            .filter_map(|item| item.document)
            .map(Booking::from)
            .collect();

        tracing::debug!(
            count = bookings.len(),
            start = %window.start,
            end = %window.end,
            "Queried bookings"
        );

        Ok(bookings)
    }

    async fn device_tokens(&self, user_id: &str) -> Result<Vec<String>, FirebaseError> {
        let base = self.documents_url(&["documents", USERS_COLLECTION, user_id, TOKENS_COLLECTION])?;
        let mut tokens = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = base.clone();
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", TOKENS_PAGE_SIZE);
                if let Some(ref page) = page_token {
                    query.append_pair("pageToken", page);
                }
            }

            let token = self.app.tokens.access_token().await?;
            let response = self.app.client.get(url).bearer_auth(token).send().await?;
            let body = Self::check(response).await?;

            let page: ListDocumentsResponse =
                serde_json::from_str(&body).map_err(|e| FirebaseError::Decode(e.to_string()))?;

            tokens.extend(page.documents.iter().map(|doc| doc.id().to_string()));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(tokens)
    }
}
