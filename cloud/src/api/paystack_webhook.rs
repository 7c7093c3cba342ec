//! Paystack webhook handler
//!
//! POST /webhooks/paystack — must receive the raw body (not JSON) for
//! HMAC-SHA512 signature verification. Only `charge.success` materializes an
//! order; every other event is acknowledged and dropped.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};
use shared::models::PaymentMethod;

use crate::error::ServiceError;
use crate::payments::metadata::CheckoutMetadata;
use crate::payments::paystack;
use crate::reconcile::{CompletedCharge, UpsertOutcome};
use crate::state::AppState;

pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let sig_header = match headers
        .get("x-paystack-signature")
        .and_then(|v| v.to_str().ok())
    {
        Some(s) => s,
        None => {
            tracing::warn!("missing x-paystack-signature header");
            return reject(ErrorCode::SignatureInvalid);
        }
    };

    if let Err(e) = paystack::verify_signature(&body, sig_header, &state.paystack_secret_key) {
        tracing::warn!(error = e, "paystack signature verification failed");
        return reject(ErrorCode::SignatureInvalid);
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "failed to parse paystack webhook JSON");
            return reject(ErrorCode::InvalidFormat);
        }
    };

    let event_type = payload["event"].as_str().unwrap_or("");
    tracing::info!(event_type, "received paystack webhook");

    let charge = match charge_from_event(&payload) {
        Ok(Some(charge)) => charge,
        Ok(None) => {
            tracing::debug!(event_type, "unhandled paystack event type");
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
                "paystack charge reconciled"
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

/// Extract the completed charge from a `charge.success` event.
///
/// Returns `Ok(None)` for event types this service does not consume. The
/// buyer email prefers the provider's customer record over the metadata
/// echo; names go the other way since Paystack customer names are optional.
fn charge_from_event(payload: &Value) -> Result<Option<CompletedCharge>, AppError> {
    if payload["event"].as_str() != Some("charge.success") {
        return Ok(None);
    }
    let data = &payload["data"];

    let reference = data["reference"]
        .as_str()
        .ok_or_else(|| AppError::invalid_request("charge.success missing reference"))?;
    let amount_minor = data["amount"]
        .as_i64()
        .ok_or_else(|| AppError::invalid_request("charge.success missing amount"))?;
    let currency = data["currency"]
        .as_str()
        .ok_or_else(|| AppError::invalid_request("charge.success missing currency"))?;

    let metadata = CheckoutMetadata::decode_json(&data["metadata"])?;

    let buyer_email = data["customer"]["email"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| metadata.buyer_email.clone());
    let (first_name, last_name) = if metadata.first_name.is_empty() {
        (
            data["customer"]["first_name"].as_str().unwrap_or("").to_string(),
            data["customer"]["last_name"].as_str().unwrap_or("").to_string(),
        )
    } else {
        (metadata.first_name.clone(), metadata.last_name.clone())
    };

    Ok(Some(CompletedCharge {
        reference: reference.to_string(),
        buyer_email,
        first_name,
        last_name,
        amount_minor,
        currency: currency.to_string(),
        method: PaymentMethod::Paystack,
        metadata,
    }))
}
