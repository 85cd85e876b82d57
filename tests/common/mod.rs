#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use booking_functions::{
    AppState, ReminderBackend, build_router,
    models::{
        booking::{Booking, ReminderWindow},
        notification::{BatchResponse, MulticastMessage, SendResponse},
        payment::{PaymentIntent, PaymentIntentParams},
    },
    services::{
        firebase::FirebaseError,
        firestore::BookingStore,
        messaging::PushMessenger,
        payment_service::{PaymentError, PaymentProcessor},
    },
};
use secrecy::SecretString;
use tokio::sync::Barrier;
use tower::util::ServiceExt;

pub const CRON_SECRET: &str = "test-cron-secret";
pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/service_account_key.pem");

/// Payment processor that records every call.
#[derive(Default)]
pub struct FakeProcessor {
    pub calls: Mutex<Vec<PaymentIntentParams>>,
    pub failure: Option<String>,
}

impl FakeProcessor {
    pub fn failing(message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> Result<PaymentIntent, PaymentError> {
        self.calls.lock().unwrap().push(params.clone());

        if let Some(ref message) = self.failure {
            return Err(PaymentError::Api(message.clone()));
        }

        Ok(PaymentIntent {
            id: "pi_test_1".to_string(),
            client_secret: Some("pi_test_1_secret_abc".to_string()),
            status: Some("requires_payment_method".to_string()),
        })
    }
}

/// In-memory booking store.
#[derive(Default)]
pub struct FakeStore {
    pub bookings: Vec<Booking>,
    pub tokens: HashMap<String, Vec<String>>,
    pub queries: Mutex<Vec<ReminderWindow>>,
    pub token_lookups: Mutex<Vec<String>>,
    pub fail_query: bool,
    /// Every token lookup waits here before answering
    pub lookup_barrier: Option<Arc<Barrier>>,
}

impl FakeStore {
    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl BookingStore for FakeStore {
    async fn bookings_between(
        &self,
        window: &ReminderWindow,
    ) -> Result<Vec<Booking>, FirebaseError> {
        self.queries.lock().unwrap().push(*window);

        if self.fail_query {
            return Err(FirebaseError::Api {
                status: 503,
                message: "unavailable".to_string(),
            });
        }

        Ok(self.bookings.clone())
    }

    async fn device_tokens(&self, user_id: &str) -> Result<Vec<String>, FirebaseError> {
        self.token_lookups.lock().unwrap().push(user_id.to_string());

        if let Some(barrier) = &self.lookup_barrier {
            barrier.wait().await;
        }

        Ok(self.tokens.get(user_id).cloned().unwrap_or_default())
    }
}

/// Messenger that records multicasts and fails for chosen tokens.
#[derive(Default)]
pub struct FakeMessenger {
    pub sent: Mutex<Vec<MulticastMessage>>,
    pub failing_tokens: HashSet<String>,
}

impl FakeMessenger {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl PushMessenger for FakeMessenger {
    async fn send_each_for_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<BatchResponse, FirebaseError> {
        self.sent.lock().unwrap().push(message.clone());

        if message.tokens.iter().any(|t| self.failing_tokens.contains(t)) {
            return Err(FirebaseError::Api {
                status: 500,
                message: "messaging backend error".to_string(),
            });
        }

        Ok(BatchResponse::from(
            message
                .tokens
                .iter()
                .map(|t| SendResponse::success(t.clone(), format!("projects/demo/messages/{}", t)))
                .collect::<Vec<_>>(),
        ))
    }
}

pub fn booking(id: &str, user_id: &str, attraction: &str) -> Booking {
    Booking {
        id: id.to_string(),
        booking_timestamp: None,
        user_id: Some(user_id.to_string()),
        attraction_name: Some(attraction.to_string()),
    }
}

pub fn test_state(
    processor: Arc<FakeProcessor>,
    reminders: Option<(Arc<FakeStore>, Arc<FakeMessenger>)>,
) -> AppState {
    AppState {
        payments: processor,
        reminders: reminders.map(|(store, messenger)| ReminderBackend {
            store,
            messenger,
        }),
        cron_secret: Some(SecretString::new(CRON_SECRET.to_string())),
        currency: "usd".to_string(),
    }
}

/// Send a request through the router and return status plus body text.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub fn app(state: AppState) -> Router {
    build_router(state)
}

/// Service-account blob pointing its token endpoint at `token_base`.
pub fn service_account_json(token_base: &str) -> String {
    serde_json::json!({
        "type": "service_account",
        "project_id": "demo-project",
        "private_key_id": "test-key",
        "private_key": TEST_PRIVATE_KEY,
        "client_email": "svc@demo-project.iam.gserviceaccount.com",
        "token_uri": format!("{}/token", token_base),
    })
    .to_string()
}
