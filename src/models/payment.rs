//! Payment-intent request/response types.
//!
//! This module defines:
//! - `CreatePaymentIntentRequest`: Request body for `POST /api/create-payment-intent`
//! - `PaymentAmount`: The caller's amount, forwarded without type or range checks
//! - `PaymentIntentParams`: What is sent to the payment processor
//! - `PaymentIntent`: The processor's answer
//! - `CreatePaymentIntentResponse`: Response body returned to clients

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for creating a payment intent.
///
/// # JSON Example
///
/// ```json
/// {
///   "amount": 2500
/// }
/// ```
///
/// `amount` is kept as raw JSON. Only its presence is checked here; whether
/// it is a sensible integer is up to the payment processor.
#[derive(Debug, Default)]
pub struct CreatePaymentIntentRequest {
    pub amount: Option<Value>,
}

impl CreatePaymentIntentRequest {
    /// Read the request from a parsed JSON body.
    ///
    /// Only a JSON object can carry `amount`; arrays, strings and other
    /// top-level values yield a request without one.
    pub fn from_json(body: &Value) -> Self {
        Self {
            amount: body
                .as_object()
                .and_then(|fields| fields.get("amount"))
                .cloned(),
        }
    }

    /// Read the request from raw body bytes.
    ///
    /// An empty or unparseable body is treated as a request without an amount.
    pub fn from_slice(body: &[u8]) -> Self {
        serde_json::from_slice::<Value>(body)
            .map(|value| Self::from_json(&value))
            .unwrap_or_default()
    }

    /// Returns the amount if it counts as present.
    ///
    /// `null`, `false`, `0`, `""` and a missing field are all absent.
    pub fn present_amount(&self) -> Option<PaymentAmount> {
        self.amount
            .as_ref()
            .filter(|value| is_truthy(value))
            .cloned()
            .map(PaymentAmount)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Amount in the smallest currency unit, exactly as the caller sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentAmount(Value);

impl PaymentAmount {
    /// Text used for the form-encoded `amount` parameter.
    pub fn as_form_value(&self) -> String {
        match &self.0 {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

impl From<i64> for PaymentAmount {
    fn from(amount: i64) -> Self {
        Self(Value::from(amount))
    }
}

/// Parameters for a payment-intent creation call.
#[derive(Debug, Clone)]
pub struct PaymentIntentParams {
    pub amount: PaymentAmount,

    /// Lowercase ISO 4217 code, fixed by configuration
    pub currency: String,

    /// Let the processor pick payment methods from its dashboard settings
    pub automatic_payment_methods: bool,
}

/// Payment intent as returned by the processor.
///
/// Only the fields this service reads are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,

    /// Secret the client app uses to confirm the payment
    pub client_secret: Option<String>,

    #[serde(default)]
    pub status: Option<String>,
}

/// Response body for a created payment intent.
///
/// # JSON Example
///
/// ```json
/// {
///   "clientSecret": "pi_3Nx..._secret_abc"
/// }
/// ```
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl From<PaymentIntent> for CreatePaymentIntentResponse {
    fn from(intent: PaymentIntent) -> Self {
        Self {
            client_secret: intent.client_secret,
        }
    }
}
