//! Payment processor client.
//!
//! Creates payment intents through Stripe's REST API. The handler only sees
//! the [`PaymentProcessor`] trait so tests can swap in a fake processor.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::models::payment::{PaymentIntent, PaymentIntentParams};

/// Matches the processor SDK's default request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(80);

/// Errors from the payment processor.
///
/// The display text is what the caller ends up seeing, so `Api` carries the
/// processor's own message unchanged.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("You did not provide an API key.")]
    MissingApiKey,

    /// Processor rejected the request
    #[error("{0}")]
    Api(String),

    /// Network or protocol failure talking to the processor
    #[error("{0}")]
    Connection(#[from] reqwest::Error),
}

/// Something that can create payment intents.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> Result<PaymentIntent, PaymentError>;
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: Option<SecretString>,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
}

impl StripeClient {
    /// Create a client. A missing key is accepted here and reported on the
    /// first request.
    pub fn new(secret_key: Option<SecretString>, api_base: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    /// Create a payment intent.
    ///
    /// # Request
    ///
    /// `POST /v1/payment_intents`, form-encoded:
    /// - `amount`
    /// - `currency`
    /// - `automatic_payment_methods[enabled]=true`
    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> Result<PaymentIntent, PaymentError> {
        let secret_key = self.secret_key.as_ref().ok_or(PaymentError::MissingApiKey)?;

        let mut form = vec![
            ("amount", params.amount.as_form_value()),
            ("currency", params.currency.clone()),
        ];
        if params.automatic_payment_methods {
            form.push(("automatic_payment_methods[enabled]", "true".to_string()));
        }

        let url = format!("{}/v1/payment_intents", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let intent: PaymentIntent = serde_json::from_str(&body)
                .map_err(|e| PaymentError::Api(format!("Invalid payment intent response: {}", e)))?;

            tracing::info!(payment_intent = %intent.id, "Payment intent created");

            return Ok(intent);
        }

        let message = match serde_json::from_str::<StripeErrorBody>(&body) {
            Ok(StripeErrorBody { error }) => {
                tracing::warn!(
                    status = %status,
                    error_type = ?error.kind,
                    error_code = ?error.code,
                    "Payment processor rejected payment intent"
                );
                error
                    .message
                    .unwrap_or_else(|| format!("Payment processor returned {}", status))
            }
            Err(_) => format!("Payment processor returned {}", status),
        };

        Err(PaymentError::Api(message))
    }
}
