//! Paystack REST client and webhook verification
//!
//! Charges are initialized over plain REST. The organizer's subaccount
//! receives the settlement minus a flat `transaction_charge` kept by the
//! platform. Webhooks are signed with HMAC-SHA512 of the raw body under
//! the account secret key.

use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha512;
use shared::error::{AppError, ErrorCode};

use super::metadata::CheckoutMetadata;

const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

#[derive(Debug, Clone)]
pub struct PaystackClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

/// Inputs for a transaction initialization
#[derive(Debug, Clone)]
pub struct InitializeParams<'a> {
    pub email: &'a str,
    pub amount_minor: i64,
    pub currency: &'a str,
    pub reference: &'a str,
    pub callback_url: &'a str,
    pub subaccount: &'a str,
    /// Platform share in minor units, kept out of the subaccount settlement
    pub platform_fee_minor: i64,
    pub metadata: &'a CheckoutMetadata,
}

/// Request body for `POST /transaction/initialize`.
pub fn build_initialize_payload(params: &InitializeParams<'_>) -> serde_json::Value {
    json!({
        "email": params.email,
        "amount": params.amount_minor,
        "currency": params.currency,
        "reference": params.reference,
        "callback_url": params.callback_url,
        "subaccount": params.subaccount,
        "transaction_charge": params.platform_fee_minor,
        "bearer": "subaccount",
        "metadata": params.metadata.encode(),
    })
}

impl PaystackClient {
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

    /// Initialize a transaction and return the hosted authorization URL.
    pub async fn initialize_transaction(
        &self,
        params: &InitializeParams<'_>,
    ) -> Result<String, AppError> {
        let payload = build_initialize_payload(params);

        let response = self
            .http
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.map_err(request_error)?;

        if !status.is_success() || body["status"].as_bool() != Some(true) {
            let message = body["message"].as_str().unwrap_or("unknown provider error");
            tracing::warn!(%status, message, "paystack initialize failed");
            return Err(AppError::provider(format!("paystack: {}", message)));
        }

        body["data"]["authorization_url"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AppError::provider("paystack: no authorization_url in response"))
    }
}

fn request_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::new(ErrorCode::ProviderTimeout)
    } else {
        AppError::with_message(ErrorCode::NetworkError, format!("paystack: {}", e))
    }
}

/// Verify the `x-paystack-signature` header against the raw request body.
pub fn verify_signature(
    payload: &[u8],
    signature_hex: &str,
    secret: &str,
) -> Result<(), &'static str> {
    let signature = hex::decode(signature_hex.trim()).map_err(|_| "signature is not hex")?;

    let mut mac =
        Hmac::<Sha512>::new_from_slice(secret.as_bytes()).map_err(|_| "invalid key length")?;
    mac.update(payload);
    mac.verify_slice(&signature)
        .map_err(|_| "signature mismatch")
}
