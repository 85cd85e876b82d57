//! Booking Functions - payment intents and next-day booking reminders.
//!
//! Two independent endpoints share one HTTP server:
//!
//! - `POST /api/create-payment-intent` forwards an amount to the payment
//!   processor and returns the intent's client secret
//! - `GET|POST /api/send-reminders` is called by a scheduler. It finds
//!   tomorrow's bookings in Firestore and pushes a reminder to each booking
//!   user's devices through Cloud Messaging
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Payment processor**: Stripe REST API via reqwest
//! - **Document store / push**: Firestore and FCM REST APIs, OAuth2 service-account auth
//! - **Authentication**: Shared scheduler secret as a bearer token

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use secrecy::SecretString;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::services::{
    firebase::{FirebaseApp, FirebaseError},
    firestore::{BookingStore, FirestoreClient},
    messaging::{FcmClient, PushMessenger},
    payment_service::{PaymentProcessor, StripeClient},
};

/// Document store and messenger used by the reminder endpoint.
#[derive(Clone)]
pub struct ReminderBackend {
    pub store: Arc<dyn BookingStore>,
    pub messenger: Arc<dyn PushMessenger>,
}

/// Shared state handed to every handler.
///
/// Built once at startup from [`Config`]; nothing in it changes afterwards.
#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<dyn PaymentProcessor>,

    /// `None` when Firebase failed to initialize
    pub reminders: Option<ReminderBackend>,

    pub cron_secret: Option<SecretString>,

    /// Currency for every payment intent
    pub currency: String,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// Firebase initialization failures are logged and leave `reminders`
    /// empty instead of failing startup; the reminder endpoint then answers
    /// with a server error.
    ///
    /// # Errors
    ///
    /// Returns an error only if an HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let payments = StripeClient::new(config.stripe_secret_key.clone(), &config.stripe_api_base)?;

        let reminders = match init_reminder_backend(config) {
            Ok(backend) => {
                tracing::info!("Firebase initialized");
                Some(backend)
            }
            Err(e) => {
                tracing::error!(error = %e, "Firebase admin initialization error");
                None
            }
        };

        Ok(Self {
            payments: Arc::new(payments),
            reminders,
            cron_secret: config.cron_secret.clone(),
            currency: config.payment_currency.clone(),
        })
    }
}

fn init_reminder_backend(config: &Config) -> Result<ReminderBackend, FirebaseError> {
    use secrecy::ExposeSecret;

    let json = config.firebase_service_account_json.as_ref().ok_or_else(|| {
        FirebaseError::Credentials("FIREBASE_SERVICE_ACCOUNT_JSON is not set".to_string())
    })?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()?;
    let app = FirebaseApp::from_service_account_json(json.expose_secret(), client)?;

    Ok(ReminderBackend {
        store: Arc::new(FirestoreClient::new(app.clone(), &config.firestore_api_base)?),
        messenger: Arc::new(FcmClient::new(app, &config.fcm_api_base)?),
    })
}

/// Build the HTTP router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Scheduler-only routes
    let cron_routes = Router::new()
        .route(
            "/api/send-reminders",
            get(handlers::reminders::send_reminders).post(handlers::reminders::send_reminders),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::cron_auth::cron_auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/create-payment-intent",
            post(handlers::payments::create_payment_intent),
        )
        .merge(cron_routes)
        // The mobile app calls the payment endpoint from any origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
