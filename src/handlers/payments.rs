//! Payment-intent HTTP handler.
//!
//! - POST /api/create-payment-intent - Create a payment intent and return its client secret

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
};

use crate::{
    AppState,
    error::AppError,
    models::payment::{CreatePaymentIntentRequest, CreatePaymentIntentResponse, PaymentIntentParams},
};

/// Create a payment intent.
///
/// # Request Body
///
/// ```json
/// {
///   "amount": 2500
/// }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{"clientSecret": "pi_..._secret_..."}`
/// - **Error (400)**: `{"error": "Amount is required."}`, the processor is not called
/// - **Error (500)**: `{"error": "<processor message>"}`
///
/// The amount is forwarded as sent, with the configured currency and
/// automatic payment methods enabled. Sign, type and range are left to the
/// processor.
///
/// Bodies without a JSON content type, empty or unparseable bodies, and JSON
/// bodies that are not objects all count as a missing amount.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CreatePaymentIntentResponse>, AppError> {
    let request = if has_json_content_type(&headers) {
        CreatePaymentIntentRequest::from_slice(&body)
    } else {
        CreatePaymentIntentRequest::default()
    };

    let amount = request.present_amount().ok_or(AppError::AmountRequired)?;

    let params = PaymentIntentParams {
        amount,
        currency: state.currency.clone(),
        automatic_payment_methods: true,
    };

    let intent = state
        .payments
        .create_payment_intent(&params)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Payment intent creation failed"))?;

    Ok(Json(intent.into()))
}

/// `application/json`, with or without parameters such as `charset`.
fn has_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}
