//! Firebase service-account credentials and OAuth2 access tokens.
//!
//! Firestore and Cloud Messaging both accept a Google OAuth2 bearer token.
//! The token is obtained by signing a JWT assertion with the service
//! account's RSA key and exchanging it at the account's `token_uri`.
//!
//! # Flow
//!
//! 1. Parse the service-account JSON blob and check the private key
//! 2. On first use, sign an RS256 assertion and exchange it for a token
//! 3. Reuse the token until shortly before it expires

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const SCOPES: &str = "https://www.googleapis.com/auth/datastore \
                      https://www.googleapis.com/auth/firebase.messaging \
                      https://www.googleapis.com/auth/cloud-platform";

/// Lifetime requested for each signed assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh tokens this long before the upstream expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Errors from Firebase credentials, Firestore and Cloud Messaging.
#[derive(Debug, thiserror::Error)]
pub enum FirebaseError {
    /// Service-account blob is unusable
    #[error("Invalid service account credentials: {0}")]
    Credentials(String),

    /// OAuth2 token exchange failed
    #[error("Access token request failed: {0}")]
    Token(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a non-success status
    #[error("Firebase API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Upstream answered with something we could not decode
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Message rejected before sending
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// Fields of a Google service-account key file used by this service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    private_key: SecretString,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccount {
    pub fn from_json(json: &str) -> Result<Self, FirebaseError> {
        serde_json::from_str(json).map_err(|e| FirebaseError::Credentials(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    access_token: SecretString,
    expires_at: DateTime<Utc>,
}

/// Issues OAuth2 access tokens for a service account.
pub struct TokenProvider {
    client: Client,
    account: ServiceAccount,
    encoding_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// # Errors
    ///
    /// Returns `Credentials` if the private key is not an RSA PEM key.
    pub fn new(account: ServiceAccount, client: Client) -> Result<Self, FirebaseError> {
        let encoding_key = EncodingKey::from_rsa_pem(account.private_key.expose_secret().as_bytes())
            .map_err(|e| FirebaseError::Credentials(format!("Failed to parse private key: {}", e)))?;

        Ok(Self {
            client,
            account,
            encoding_key,
            cached: Mutex::new(None),
        })
    }

    /// Return a valid access token, exchanging a new assertion if needed.
    pub async fn access_token(&self) -> Result<String, FirebaseError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now() {
                return Ok(token.access_token.expose_secret().clone());
            }
        }

        let fresh = self.exchange_assertion().await?;
        let access_token = fresh.access_token.expose_secret().clone();
        *cached = Some(fresh);

        Ok(access_token)
    }

    async fn exchange_assertion(&self) -> Result<CachedToken, FirebaseError> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: SCOPES,
            aud: &self.account.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| FirebaseError::Credentials(format!("Failed to sign assertion: {}", e)))?;

        let response = self
            .client
            .post(&self.account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FirebaseError::Token(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| FirebaseError::Token(format!("Malformed token response: {}", e)))?;

        tracing::debug!(expires_in = token.expires_in, "Obtained Google access token");

        Ok(CachedToken {
            access_token: SecretString::new(token.access_token),
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

/// Initialized Firebase project: project ID plus a shared token provider.
#[derive(Clone)]
pub struct FirebaseApp {
    pub project_id: String,
    pub client: Client,
    pub tokens: Arc<TokenProvider>,
}

impl FirebaseApp {
    /// Initialize from the service-account JSON blob.
    pub fn from_service_account_json(json: &str, client: Client) -> Result<Self, FirebaseError> {
        let account = ServiceAccount::from_json(json)?;
        let project_id = account.project_id.clone();
        let tokens = TokenProvider::new(account, client.clone())?;

        Ok(Self {
            project_id,
            client,
            tokens: Arc::new(tokens),
        })
    }
}
