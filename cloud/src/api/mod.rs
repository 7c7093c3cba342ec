//! API routes for stagepass-cloud

pub mod checkout;
pub mod events;
pub mod health;
pub mod orders;
pub mod paystack_webhook;
pub mod stripe_webhook;
pub mod users;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // JSON API (no auth; the deployment fronts this with a gateway)
    let api = Router::new()
        .route("/api/users", post(users::create_user))
        .route("/api/users/{id}", get(users::get_user))
        .route("/api/users/{id}/payout", put(users::update_payout))
        .route("/api/events", post(events::create_event))
        .route("/api/events/{id}", get(events::get_event))
        .route("/api/events/{id}/publish", post(events::publish_event))
        .route("/api/checkout", post(checkout::initiate_checkout))
        .route("/api/orders/verify", get(orders::verify_order))
        .route("/api/orders/{id}", get(orders::get_order));

    // Provider webhooks (signature-verified, raw body)
    let webhooks = Router::new()
        .route("/webhooks/paystack", post(paystack_webhook::handle_webhook))
        .route("/webhooks/stripe", post(stripe_webhook::handle_webhook));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(api)
        .merge(webhooks)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
