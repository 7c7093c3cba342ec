//! Checkout endpoint

use axum::Json;
use axum::extract::State;
use shared::error::ApiResponse;

use crate::error::ServiceResult;
use crate::reconcile::{CheckoutOutcome, CheckoutRequest};
use crate::state::AppState;

/// POST /api/checkout
pub async fn initiate_checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> ServiceResult<ApiResponse<CheckoutOutcome>> {
    let outcome = state.reconciler.initiate_checkout(&req).await?;
    Ok(ApiResponse::success(outcome))
}
