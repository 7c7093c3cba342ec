//! User management endpoints

use axum::Json;
use axum::extract::{Path, State};
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{PayoutUpdate, User, UserCreate};
use shared::util;

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<UserCreate>,
) -> ServiceResult<ApiResponse<User>> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("email is invalid").into());
    }
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(AppError::validation("firstName and lastName are required").into());
    }

    if db::users::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(ErrorCode::EmailExists.into());
    }

    let user = User {
        id: util::new_id(),
        email,
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        subaccount_code: req.subaccount_code,
        stripe_account_id: req.stripe_account_id,
        created_at: util::now_millis(),
    };
    db::users::insert(&state.pool, &user).await?;

    tracing::info!(user_id = %user.id, "user created");
    Ok(ApiResponse::success(user))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServiceResult<ApiResponse<User>> {
    let user = db::users::find_by_id(&state.pool, &id)
        .await?
        .ok_or(ErrorCode::UserNotFound)?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/users/{id}/payout
pub async fn update_payout(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PayoutUpdate>,
) -> ServiceResult<ApiResponse<User>> {
    if req.subaccount_code.is_none() && req.stripe_account_id.is_none() {
        return Err(
            AppError::validation("subaccountCode or stripeAccountId is required").into(),
        );
    }

    let rows = db::users::update_payout(
        &state.pool,
        &id,
        req.subaccount_code.as_deref(),
        req.stripe_account_id.as_deref(),
    )
    .await?;
    if rows == 0 {
        return Err(ErrorCode::UserNotFound.into());
    }

    let user = db::users::find_by_id(&state.pool, &id)
        .await?
        .ok_or(ErrorCode::UserNotFound)?;

    tracing::info!(user_id = %id, "payout identifiers updated");
    Ok(ApiResponse::success(user))
}
