//! Application configuration management.
//!
//! Configuration is read from environment variables once at startup with the
//! `envy` crate and handed to the handlers through [`crate::AppState`]. Nothing
//! is reloaded at runtime.

use secrecy::SecretString;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `STRIPE_SECRET_KEY` (optional): Payment processor secret key
/// - `FIREBASE_SERVICE_ACCOUNT_JSON` (optional): Service account credential blob
///   for Firestore and Cloud Messaging
/// - `CRON_SECRET` (optional): Shared secret the scheduler presents as a bearer token
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `PAYMENT_CURRENCY` (optional): Currency for every payment intent, defaults to `usd`
/// - `STRIPE_API_BASE`, `FIRESTORE_API_BASE`, `FCM_API_BASE` (optional): Upstream base URLs
///
/// Missing credentials do not stop the process. Requests that need them fail
/// later with an upstream or initialization error.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub stripe_secret_key: Option<SecretString>,

    pub firebase_service_account_json: Option<SecretString>,

    pub cron_secret: Option<SecretString>,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_currency")]
    pub payment_currency: String,

    #[serde(default = "default_stripe_api_base")]
    pub stripe_api_base: String,

    #[serde(default = "default_firestore_api_base")]
    pub firestore_api_base: String,

    #[serde(default = "default_fcm_api_base")]
    pub fcm_api_base: String,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_stripe_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_firestore_api_base() -> String {
    "https://firestore.googleapis.com".to_string()
}

fn default_fcm_api_base() -> String {
    "https://fcm.googleapis.com".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed into
    /// its expected type (e.g. a non-numeric `SERVER_PORT`).
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }
}
