//! Order read endpoints
//!
//! `GET /api/orders/{id}` is the populated internal view; `GET
//! /api/orders/verify` is the public ticket view the payment callback page
//! polls, so it exposes no buyer contact details.

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{Event, Order, PaymentMethod, PaymentStatus, User};

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub currency: String,
}

impl From<Event> for EventSummary {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            title: event.title,
            subtitle: event.subtitle,
            location: event.location,
            currency: event.currency,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerSummary {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Order with its event and registered buyer resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedOrder {
    #[serde(flatten)]
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer: Option<BuyerSummary>,
}

/// Public ticket view: payment state plus what the ticket shows, nothing
/// that identifies the buyer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderVerification {
    pub reference: String,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub quantity: u32,
    pub total_amount: String,
    pub currency: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer_name: Option<String>,
}

fn verification_view(
    order: &Order,
    event: Option<Event>,
    organizer: Option<User>,
) -> OrderVerification {
    OrderVerification {
        reference: order.reference.clone(),
        payment_status: order.payment_status,
        payment_method: order.payment_method,
        quantity: order.quantity,
        total_amount: order.total_amount.clone(),
        currency: order.currency.clone(),
        created_at: order.created_at,
        event: event.map(EventSummary::from),
        organizer_name: organizer.map(|u| u.full_name()),
    }
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServiceResult<ApiResponse<PopulatedOrder>> {
    let order = db::orders::find_by_id(&state.pool, &id)
        .await?
        .ok_or(ErrorCode::OrderNotFound)?;

    let event = db::events::find_by_id(&state.pool, &order.event_id)
        .await?
        .map(EventSummary::from);

    let buyer = match &order.buyer_id {
        Some(buyer_id) => db::users::find_by_id(&state.pool, buyer_id)
            .await?
            .map(|u| BuyerSummary {
                id: u.id,
                email: u.email,
                first_name: u.first_name,
                last_name: u.last_name,
            }),
        None => None,
    };

    Ok(ApiResponse::success(PopulatedOrder {
        order,
        event,
        buyer,
    }))
}

/// Lookup keys for verification; Paystack callbacks carry `trxref`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyQuery {
    pub order_id: Option<String>,
    pub reference: Option<String>,
    pub trxref: Option<String>,
}

/// GET /api/orders/verify
pub async fn verify_order(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> ServiceResult<ApiResponse<OrderVerification>> {
    let order = if let Some(id) = query.order_id.as_deref().filter(|s| !s.is_empty()) {
        db::orders::find_by_id(&state.pool, id).await?
    } else if let Some(reference) = query
        .reference
        .as_deref()
        .or(query.trxref.as_deref())
        .filter(|s| !s.is_empty())
    {
        db::orders::find_by_reference(&state.pool, reference).await?
    } else {
        return Err(AppError::invalid_request("orderId or reference is required").into());
    };
    let order = order.ok_or(ErrorCode::OrderNotFound)?;

    let event = db::events::find_by_id(&state.pool, &order.event_id).await?;
    let organizer = match &event {
        Some(event) => db::users::find_by_id(&state.pool, &event.organizer_id).await?,
        None => None,
    };

    Ok(ApiResponse::success(verification_view(
        &order, event, organizer,
    )))
}
