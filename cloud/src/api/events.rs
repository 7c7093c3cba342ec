//! Event management endpoints

use axum::Json;
use axum::extract::{Path, State};
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{Event, EventCreate, EventStatus, User};
use shared::util;

use crate::db;
use crate::error::ServiceResult;
use crate::payments::routing::RoutingRules;
use crate::state::AppState;

fn validate_event_create(req: &EventCreate) -> Result<(), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::validation("title is required"));
    }
    if req.currency.trim().is_empty() {
        return Err(AppError::validation("currency is required"));
    }
    if req.is_free && !req.price_categories.is_empty() {
        return Err(AppError::validation("a free event cannot carry price categories"));
    }
    if !req.is_free && req.price_categories.is_empty() {
        return Err(AppError::validation("a paid event needs at least one price category"));
    }
    for category in &req.price_categories {
        if category.name.trim().is_empty() {
            return Err(AppError::validation("price category name is required"));
        }
        if category.price.is_sign_negative() {
            return Err(AppError::validation("price cannot be negative"));
        }
    }
    Ok(())
}

/// A paid event only goes live once its organizer holds the payout account
/// for the provider the event routes to.
fn payout_gate(event: &Event, organizer: &User, routing: &RoutingRules) -> Result<(), AppError> {
    let provider = routing.route(&event.currency, event.location.as_deref());
    if organizer.payout_account(provider).is_none() {
        return Err(AppError::new(ErrorCode::PayoutAccountMissing));
    }
    Ok(())
}

/// POST /api/events
pub async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<EventCreate>,
) -> ServiceResult<ApiResponse<Event>> {
    validate_event_create(&req)?;

    if db::users::find_by_id(&state.pool, &req.organizer_id)
        .await?
        .is_none()
    {
        return Err(ErrorCode::UserNotFound.into());
    }

    let event = Event {
        id: util::new_id(),
        organizer_id: req.organizer_id,
        title: req.title.trim().to_string(),
        subtitle: req.subtitle,
        description: req.description,
        location: req.location,
        currency: req.currency.trim().to_uppercase(),
        is_free: req.is_free,
        price_categories: req.price_categories,
        status: EventStatus::Draft,
        created_at: util::now_millis(),
    };
    db::events::insert(&state.pool, &event).await?;

    tracing::info!(event_id = %event.id, title = %event.title, "event created");
    Ok(ApiResponse::success(event))
}

/// GET /api/events/{id}
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServiceResult<ApiResponse<Event>> {
    let event = db::events::find_by_id(&state.pool, &id)
        .await?
        .ok_or(ErrorCode::EventNotFound)?;
    Ok(ApiResponse::success(event))
}

/// POST /api/events/{id}/publish
///
/// Free events publish unconditionally; paid events pass the payout gate.
pub async fn publish_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServiceResult<ApiResponse<Event>> {
    let mut event = db::events::find_by_id(&state.pool, &id)
        .await?
        .ok_or(ErrorCode::EventNotFound)?;

    if event.status == EventStatus::Published {
        return Err(ErrorCode::EventAlreadyPublished.into());
    }

    if !event.is_free {
        let organizer = db::users::find_by_id(&state.pool, &event.organizer_id)
            .await?
            .ok_or_else(|| AppError::internal("event organizer does not exist"))?;
        payout_gate(&event, &organizer, &state.routing)?;
    }

    db::events::set_status(&state.pool, &event.id, EventStatus::Published).await?;
    event.status = EventStatus::Published;

    tracing::info!(event_id = %event.id, "event published");
    Ok(ApiResponse::success(event))
}
