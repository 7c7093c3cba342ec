//! Stripe webhook handler
//!
//! POST /webhooks/stripe — must receive the raw body (not JSON) for
//! signature verification. Card payments arrive as `payment_intent.succeeded`
//! and wallet payments as `checkout.session.completed`; a session's spawned
//! intent carries no metadata and is dropped so one purchase never
//! materializes twice.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};
use shared::models::PaymentMethod;

use crate::error::ServiceError;
use crate::payments::metadata::CheckoutMetadata;
use crate::payments::stripe;
use crate::reconcile::{CompletedCharge, UpsertOutcome};
use crate::state::AppState;

pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let sig_header = match headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    {
        Some(s) => s,
        None => {
            tracing::warn!("missing stripe-signature header");
            return reject(ErrorCode::SignatureInvalid);
        }
    };

    if let Err(e) = stripe::verify_webhook_signature(&body, sig_header, &state.stripe_webhook_secret)
    {
        tracing::warn!(error = e, "stripe signature verification failed");
        return reject(ErrorCode::SignatureInvalid);
    }

    let event: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "failed to parse stripe webhook JSON");
            return reject(ErrorCode::InvalidFormat);
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    tracing::info!(event_type, "received stripe webhook");

    let charge = match charge_from_event(&event) {
        Ok(Some(charge)) => charge,
        Ok(None) => {
            tracing::debug!(event_type, "stripe event not reconciled");
            return (StatusCode::OK, Json(json!({ "received": true })));
        }
        Err(e) => {
            tracing::warn!(code = e.code.code(), message = %e.message, "unusable charge payload");
            return (e.http_status(), Json(json!({ "message": e.message })));
        }
    };

    match state.reconciler.record_completed_charge(&charge).await {
        Ok((order, outcome)) => {
            tracing::info!(
                order_id = %order.id,
                reference = %order.reference,
                created = outcome == UpsertOutcome::Created,
                "stripe charge reconciled"
            );
            (
                StatusCode::OK,
                Json(json!({ "received": true, "orderId": order.id })),
            )
        }
        Err(ServiceError::App(e)) => {
            tracing::warn!(reference = %charge.reference, message = %e.message, "charge rejected");
            (e.http_status(), Json(json!({ "message": e.message })))
        }
        Err(ServiceError::Db(e)) => {
            tracing::error!(%e, reference = %charge.reference, "DB error recording charge");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "internal error" })),
            )
        }
    }
}

fn reject(code: ErrorCode) -> (StatusCode, Json<Value>) {
    let err = AppError::new(code);
    (err.http_status(), Json(json!({ "message": err.message })))
}

/// Extract the completed charge from a Stripe event.
///
/// Returns `Ok(None)` for event types this service does not consume and for
/// `payment_intent.succeeded` events without metadata, which are the intents
/// spawned by checkout sessions.
fn charge_from_event(event: &Value) -> Result<Option<CompletedCharge>, AppError> {
    let obj = &event["data"]["object"];
    match event["type"].as_str() {
        Some("checkout.session.completed") => {
            let reference = obj["id"]
                .as_str()
                .ok_or_else(|| AppError::invalid_request("session missing id"))?;
            let amount_minor = obj["amount_total"]
                .as_i64()
                .ok_or_else(|| AppError::invalid_request("session missing amount_total"))?;
            let currency = obj["currency"]
                .as_str()
                .ok_or_else(|| AppError::invalid_request("session missing currency"))?;

            let metadata = CheckoutMetadata::decode_json(&obj["metadata"])?;
            let buyer_email = obj["customer_details"]["email"]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(String::from)
                .unwrap_or_else(|| metadata.buyer_email.clone());
            let (first_name, last_name) =
                buyer_names(&metadata, obj["customer_details"]["name"].as_str());

            Ok(Some(CompletedCharge {
                reference: reference.to_string(),
                buyer_email,
                first_name,
                last_name,
                amount_minor,
                currency: currency.to_string(),
                method: PaymentMethod::Wallet,
                metadata,
            }))
        }
        Some("payment_intent.succeeded") => {
            let has_metadata = obj["metadata"].as_object().is_some_and(|m| !m.is_empty());
            if !has_metadata {
                return Ok(None);
            }

            let reference = obj["id"]
                .as_str()
                .ok_or_else(|| AppError::invalid_request("intent missing id"))?;
            let amount_minor = obj["amount"]
                .as_i64()
                .ok_or_else(|| AppError::invalid_request("intent missing amount"))?;
            let currency = obj["currency"]
                .as_str()
                .ok_or_else(|| AppError::invalid_request("intent missing currency"))?;

            let metadata = CheckoutMetadata::decode_json(&obj["metadata"])?;
            let buyer_email = obj["receipt_email"]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(String::from)
                .unwrap_or_else(|| metadata.buyer_email.clone());
            let first_name = metadata.first_name.clone();
            let last_name = metadata.last_name.clone();

            Ok(Some(CompletedCharge {
                reference: reference.to_string(),
                buyer_email,
                first_name,
                last_name,
                amount_minor,
                currency: currency.to_string(),
                method: PaymentMethod::Card,
                metadata,
            }))
        }
        _ => Ok(None),
    }
}

fn buyer_names(metadata: &CheckoutMetadata, customer_name: Option<&str>) -> (String, String) {
    if !metadata.first_name.is_empty() {
        return (metadata.first_name.clone(), metadata.last_name.clone());
    }
    match customer_name.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => match name.split_once(' ') {
            Some((first, last)) => (first.to_string(), last.to_string()),
            None => (name.to_string(), String::new()),
        },
        None => (String::new(), metadata.last_name.clone()),
    }
}
