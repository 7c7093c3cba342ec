//! Stripe REST client and webhook verification
//!
//! Plain REST with form-encoded bodies, no SDK. Card checkouts create a
//! PaymentIntent (client secret goes back to the frontend); wallet
//! checkouts create a hosted Checkout Session. Both carry
//! `transfer_data[destination]` for the organizer's connected account and
//! `application_fee_amount` for the platform share.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use shared::error::{AppError, ErrorCode};

use super::metadata::CheckoutMetadata;

const DEFAULT_BASE_URL: &str = "https://api.stripe.com";

/// Signatures older than this are treated as replays.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

/// Inputs shared by the PaymentIntent and Checkout Session builders
#[derive(Debug, Clone)]
pub struct ChargeParams<'a> {
    pub amount_minor: i64,
    pub currency: &'a str,
    pub customer_email: &'a str,
    /// Connected account receiving the transfer
    pub destination_account: &'a str,
    /// Platform share in minor units
    pub platform_fee_minor: i64,
    pub metadata: &'a CheckoutMetadata,
}

/// Form parameters for `POST /v1/payment_intents`.
pub fn build_payment_intent_params(params: &ChargeParams<'_>) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), params.amount_minor.to_string()),
        ("currency".to_string(), params.currency.to_lowercase()),
        ("receipt_email".to_string(), params.customer_email.to_string()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
        (
            "transfer_data[destination]".to_string(),
            params.destination_account.to_string(),
        ),
        (
            "application_fee_amount".to_string(),
            params.platform_fee_minor.to_string(),
        ),
    ];
    for (key, value) in params.metadata.encode() {
        form.push((format!("metadata[{}]", key), value));
    }
    form
}

/// Form parameters for `POST /v1/checkout/sessions`.
pub fn build_checkout_session_params(
    params: &ChargeParams<'_>,
    product_name: &str,
    unit_amount_minor: i64,
    quantity: u32,
    success_url: &str,
    cancel_url: &str,
) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("customer_email".to_string(), params.customer_email.to_string()),
        ("success_url".to_string(), success_url.to_string()),
        ("cancel_url".to_string(), cancel_url.to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            params.currency.to_lowercase(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            product_name.to_string(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            unit_amount_minor.to_string(),
        ),
        ("line_items[0][quantity]".to_string(), quantity.to_string()),
        (
            "payment_intent_data[transfer_data][destination]".to_string(),
            params.destination_account.to_string(),
        ),
        (
            "payment_intent_data[application_fee_amount]".to_string(),
            params.platform_fee_minor.to_string(),
        ),
    ];
    // session-level only; the spawned intent stays bare so its succeeded
    // event is ignored and the session event alone materializes the order
    for (key, value) in params.metadata.encode() {
        form.push((format!("metadata[{}]", key), value));
    }
    form
}

impl StripeClient {
    pub fn new(http: reqwest::Client, secret_key: String) -> Self {
        Self {
            http,
            secret_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create a PaymentIntent and return `(intent id, client secret)`.
    pub async fn create_payment_intent(
        &self,
        params: &ChargeParams<'_>,
    ) -> Result<(String, String), AppError> {
        let form = build_payment_intent_params(params);
        let body = self.post_form("/v1/payment_intents", &form).await?;

        let id = body["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AppError::provider("stripe: no id in payment intent"))?;
        let client_secret = body["client_secret"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AppError::provider("stripe: no client_secret in payment intent"))?;
        Ok((id, client_secret))
    }

    /// Create a hosted Checkout Session and return `(session id, url)`.
    pub async fn create_checkout_session(
        &self,
        params: &ChargeParams<'_>,
        product_name: &str,
        unit_amount_minor: i64,
        quantity: u32,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<(String, String), AppError> {
        let form = build_checkout_session_params(
            params,
            product_name,
            unit_amount_minor,
            quantity,
            success_url,
            cancel_url,
        );
        let body = self.post_form("/v1/checkout/sessions", &form).await?;

        let id = body["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AppError::provider("stripe: no id in checkout session"))?;
        let url = body["url"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AppError::provider("stripe: no url in checkout session"))?;
        Ok((id, url))
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<serde_json::Value, AppError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.map_err(request_error)?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown provider error");
            tracing::warn!(%status, path, message, "stripe request failed");
            return Err(AppError::provider(format!("stripe: {}", message)));
        }
        Ok(body)
    }
}

fn request_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::new(ErrorCode::ProviderTimeout)
    } else {
        AppError::with_message(ErrorCode::NetworkError, format!("stripe: {}", e))
    }
}

/// Verify a `stripe-signature` header against the raw request body.
///
/// The header carries `t=<unix seconds>,v1=<hex hmac>`; the signed payload
/// is `{t}.{body}` under HMAC-SHA256 with the webhook signing secret.
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    verify_webhook_signature_at(payload, sig_header, secret, chrono::Utc::now().timestamp())
}

fn verify_webhook_signature_at(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), &'static str> {
    let mut timestamp: Option<i64> = None;
    let mut signature: Option<Vec<u8>> = None;

    for part in sig_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse().ok();
            }
            Some(("v1", value)) => {
                signature = hex::decode(value).ok();
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or("missing timestamp")?;
    let signature = signature.ok_or("missing v1 signature")?;

    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err("timestamp outside tolerance");
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "invalid key length")?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.verify_slice(&signature).map_err(|_| "signature mismatch")
}
