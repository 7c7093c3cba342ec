//! Checkout initiation and charge reconciliation
//!
//! `initiate_checkout` validates the purchase, routes it to a provider and
//! hands back whatever the frontend needs to collect payment. No order row
//! exists until the provider confirms the charge; `record_completed_charge`
//! materializes it idempotently from the webhook. Free events skip the
//! provider entirely and materialize immediately.

pub mod store;

pub use store::{OrderStore, PgStore, UpsertOutcome};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Event, EventStatus, Order, OrderLine, PaymentMethod, PaymentStatus, ProviderKind,
};
use shared::util;

use crate::email::TicketMailer;
use crate::error::{ServiceError, ServiceResult};
use crate::payments::metadata::{Buyer, CheckoutMetadata};
use crate::payments::money;
use crate::payments::paystack::{InitializeParams, PaystackClient};
use crate::payments::routing::RoutingRules;
use crate::payments::stripe::{ChargeParams, StripeClient};

/// Checkout request from the frontend
///
/// `price` is the total decimal amount to charge; `price_categories` is the
/// buyer's tier selection, snapshotted into the order as-is.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub event_id: String,
    /// Absent or `"guest"` means guest checkout
    pub buyer_id: Option<String>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub price: Decimal,
    pub currency: String,
    pub quantity: u32,
    #[serde(default)]
    pub price_categories: Vec<OrderLine>,
    /// Required for paid events
    pub payment_method: Option<PaymentMethod>,
}

/// What the frontend does next
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CheckoutOutcome {
    /// Send the buyer to the provider's hosted page
    #[serde(rename_all = "camelCase")]
    Redirect { url: String, reference: String },
    /// Confirm the payment in-page with the provider's JS
    #[serde(rename_all = "camelCase")]
    ClientSecret {
        client_secret: String,
        reference: String,
    },
    /// Free event: the order is already completed
    #[serde(rename_all = "camelCase")]
    Free { order: Order },
}

/// A successful charge reported by a provider webhook
#[derive(Debug, Clone)]
pub struct CompletedCharge {
    pub reference: String,
    pub buyer_email: String,
    pub first_name: String,
    pub last_name: String,
    pub amount_minor: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub metadata: CheckoutMetadata,
}

#[derive(Clone)]
pub struct Reconciler<S, M> {
    store: S,
    mailer: M,
    paystack: PaystackClient,
    stripe: StripeClient,
    routing: RoutingRules,
    app_base_url: String,
}

impl<S: OrderStore, M: TicketMailer> Reconciler<S, M> {
    pub fn new(
        store: S,
        mailer: M,
        paystack: PaystackClient,
        stripe: StripeClient,
        routing: RoutingRules,
        app_base_url: String,
    ) -> Self {
        Self {
            store,
            mailer,
            paystack,
            stripe,
            routing,
            app_base_url,
        }
    }

    /// Validate a checkout and open a charge with the routed provider.
    ///
    /// All validation, including the organizer's payout account, happens
    /// before any provider traffic.
    pub async fn initiate_checkout(&self, req: &CheckoutRequest) -> ServiceResult<CheckoutOutcome> {
        let event = self
            .store
            .find_event(&req.event_id)
            .await
            .map_err(ServiceError::Db)?
            .ok_or(ErrorCode::EventNotFound)?;

        if event.status != EventStatus::Published {
            return Err(ErrorCode::EventNotPublished.into());
        }
        if req.quantity == 0 {
            return Err(AppError::validation("quantity must be at least 1").into());
        }
        if !req.currency.eq_ignore_ascii_case(&event.currency) {
            return Err(AppError::validation(format!(
                "event is priced in {}, not {}",
                event.currency, req.currency
            ))
            .into());
        }

        let buyer = self.resolve_buyer(req.buyer_id.as_deref()).await?;

        if event.is_free {
            return self.materialize_free_order(&event, &buyer, req).await;
        }

        let method = req
            .payment_method
            .filter(|m| *m != PaymentMethod::None)
            .ok_or_else(|| AppError::validation("paymentMethod is required for paid events"))?;

        let provider = self.routing.route(&req.currency, event.location.as_deref());
        if method.provider() != Some(provider) {
            return Err(AppError::validation(format!(
                "payment method {} is not available for this event",
                method.as_db()
            ))
            .into());
        }

        let organizer = self
            .store
            .find_user(&event.organizer_id)
            .await
            .map_err(ServiceError::Db)?
            .ok_or_else(|| AppError::internal("event organizer does not exist"))?;
        let payout_account = organizer
            .payout_account(provider)
            .ok_or(ErrorCode::PayoutAccountMissing)?
            .to_string();

        let total_minor = money::to_minor_units(req.price).map_err(ServiceError::App)?;
        let split = money::split_revenue(total_minor);

        let metadata = CheckoutMetadata {
            event_id: event.id.clone(),
            buyer,
            quantity: req.quantity,
            lines: req.price_categories.clone(),
            buyer_email: req.email.clone(),
            first_name: req.first_name.clone(),
            last_name: req.last_name.clone(),
        };

        match provider {
            ProviderKind::Paystack => {
                let reference = util::order_reference(&event.id);
                let url = self
                    .paystack
                    .initialize_transaction(&InitializeParams {
                        email: &req.email,
                        amount_minor: total_minor,
                        currency: &event.currency,
                        reference: &reference,
                        callback_url: &format!("{}/api/orders/verify", self.app_base_url),
                        subaccount: &payout_account,
                        platform_fee_minor: split.platform_minor,
                        metadata: &metadata,
                    })
                    .await?;
                Ok(CheckoutOutcome::Redirect { url, reference })
            }
            ProviderKind::Stripe => {
                let charge = ChargeParams {
                    amount_minor: total_minor,
                    currency: &event.currency,
                    customer_email: &req.email,
                    destination_account: &payout_account,
                    platform_fee_minor: split.platform_minor,
                    metadata: &metadata,
                };
                match method {
                    PaymentMethod::Card => {
                        let (intent_id, client_secret) =
                            self.stripe.create_payment_intent(&charge).await?;
                        Ok(CheckoutOutcome::ClientSecret {
                            client_secret,
                            reference: intent_id,
                        })
                    }
                    PaymentMethod::Wallet => {
                        let unit_price = req.price / Decimal::from(req.quantity);
                        let unit_minor =
                            money::to_minor_units(unit_price).map_err(ServiceError::App)?;
                        let (session_id, url) = self
                            .stripe
                            .create_checkout_session(
                                &charge,
                                &event.title,
                                unit_minor,
                                req.quantity,
                                &format!(
                                    "{}/events/{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
                                    self.app_base_url, event.id
                                ),
                                &format!(
                                    "{}/events/{}/checkout/cancel",
                                    self.app_base_url, event.id
                                ),
                            )
                            .await?;
                        Ok(CheckoutOutcome::Redirect {
                            url,
                            reference: session_id,
                        })
                    }
                    PaymentMethod::Paystack | PaymentMethod::None => {
                        Err(AppError::validation("payment method does not match provider").into())
                    }
                }
            }
        }
    }

    /// Materialize a completed charge reported by a provider webhook.
    ///
    /// Safe under duplicate and concurrent delivery for one reference: the
    /// order is created once and the confirmation email sent once.
    pub async fn record_completed_charge(
        &self,
        charge: &CompletedCharge,
    ) -> ServiceResult<(Order, UpsertOutcome)> {
        let event = self
            .store
            .find_event(&charge.metadata.event_id)
            .await
            .map_err(ServiceError::Db)?
            .ok_or(ErrorCode::EventNotFound)?;

        let total = Decimal::new(charge.amount_minor, 2);
        let order = Order {
            id: util::new_id(),
            event_id: event.id.clone(),
            buyer_id: charge.metadata.buyer.user_id().map(String::from),
            buyer_email: charge.buyer_email.clone(),
            first_name: charge.first_name.clone(),
            last_name: charge.last_name.clone(),
            total_amount: format!("{:.2}", total),
            currency: charge.currency.to_uppercase(),
            payment_method: charge.method,
            quantity: charge.metadata.quantity,
            price_categories: charge.metadata.lines.clone(),
            reference: charge.reference.clone(),
            payment_status: PaymentStatus::Completed,
            created_at: util::now_millis(),
        };

        let outcome = self
            .store
            .upsert_completed_order(&order)
            .await
            .map_err(ServiceError::Db)?;

        if outcome == UpsertOutcome::Created {
            self.send_confirmation(&order, &event.title).await;
        }

        Ok((order, outcome))
    }

    async fn resolve_buyer(&self, buyer_id: Option<&str>) -> ServiceResult<Buyer> {
        match buyer_id {
            None | Some("") | Some("guest") => Ok(Buyer::Guest),
            Some(id) => {
                let user = self
                    .store
                    .find_user(id)
                    .await
                    .map_err(ServiceError::Db)?
                    .ok_or(ErrorCode::UserNotFound)?;
                Ok(Buyer::Known(user.id))
            }
        }
    }

    async fn materialize_free_order(
        &self,
        event: &Event,
        buyer: &Buyer,
        req: &CheckoutRequest,
    ) -> ServiceResult<CheckoutOutcome> {
        // no provider involved, so the reference is minted locally
        let reference = format!("INT-{}", util::order_reference(&event.id));
        let order = Order {
            id: util::new_id(),
            event_id: event.id.clone(),
            buyer_id: buyer.user_id().map(String::from),
            buyer_email: req.email.clone(),
            first_name: req.first_name.clone(),
            last_name: req.last_name.clone(),
            total_amount: "0.00".to_string(),
            currency: event.currency.clone(),
            payment_method: PaymentMethod::None,
            quantity: req.quantity,
            price_categories: req.price_categories.clone(),
            reference,
            payment_status: PaymentStatus::Completed,
            created_at: util::now_millis(),
        };

        let outcome = self
            .store
            .upsert_completed_order(&order)
            .await
            .map_err(ServiceError::Db)?;

        if outcome == UpsertOutcome::Created {
            self.send_confirmation(&order, &event.title).await;
        }

        Ok(CheckoutOutcome::Free { order })
    }

    async fn send_confirmation(&self, order: &Order, event_title: &str) {
        if let Err(e) = self.mailer.send_ticket_confirmation(order, event_title).await {
            tracing::warn!(
                reference = %order.reference,
                error = %e,
                "ticket confirmation email failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::store::memory::MemoryStore;
    use super::*;
    use shared::models::{PriceCategory, User};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::BoxError;

    #[derive(Clone, Default)]
    struct RecordingMailer {
        sent: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl TicketMailer for RecordingMailer {
        async fn send_ticket_confirmation(
            &self,
            _order: &Order,
            _event_title: &str,
        ) -> Result<(), BoxError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn organizer(with_subaccount: bool) -> User {
        User {
            id: "usr-org".to_string(),
            email: "org@example.com".to_string(),
            first_name: "Ngozi".to_string(),
            last_name: "Eze".to_string(),
            subaccount_code: with_subaccount.then(|| "ACCT_abc123".to_string()),
            stripe_account_id: None,
            created_at: 0,
        }
    }

    fn paid_event() -> Event {
        Event {
            id: "evt-1".to_string(),
            organizer_id: "usr-org".to_string(),
            title: "Lagos Tech Fest".to_string(),
            subtitle: None,
            description: None,
            location: Some("Landmark Centre, Lagos, Nigeria".to_string()),
            currency: "NGN".to_string(),
            is_free: false,
            price_categories: vec![PriceCategory {
                name: "Regular".to_string(),
                price: Decimal::new(5000, 2),
                quantity_cap: Some(4),
            }],
            status: EventStatus::Published,
            created_at: 0,
        }
    }

    fn free_event() -> Event {
        Event {
            id: "evt-free".to_string(),
            organizer_id: "usr-org".to_string(),
            title: "Community Meetup".to_string(),
            subtitle: None,
            description: None,
            location: Some("Yaba, Lagos, Nigeria".to_string()),
            currency: "NGN".to_string(),
            is_free: true,
            price_categories: Vec::new(),
            status: EventStatus::Published,
            created_at: 0,
        }
    }

    fn reconciler(
        store: MemoryStore,
        mailer: RecordingMailer,
    ) -> Reconciler<MemoryStore, RecordingMailer> {
        let http = reqwest::Client::new();
        Reconciler::new(
            store,
            mailer,
            PaystackClient::new(http.clone(), "sk_test".to_string()),
            StripeClient::new(http, "sk_test".to_string()),
            RoutingRules::default(),
            "https://app.example.com".to_string(),
        )
    }

    fn checkout_request() -> CheckoutRequest {
        CheckoutRequest {
            event_id: "evt-1".to_string(),
            buyer_id: None,
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            price: Decimal::new(10000, 2),
            currency: "NGN".to_string(),
            quantity: 2,
            price_categories: vec![OrderLine {
                name: "Regular".to_string(),
                price: Decimal::new(5000, 2),
                quantity: 2,
            }],
            payment_method: Some(PaymentMethod::Paystack),
        }
    }

    fn completed_charge() -> CompletedCharge {
        CompletedCharge {
            reference: "evt-1-1700000000000-abcd1234".to_string(),
            buyer_email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            amount_minor: 10_000,
            currency: "ngn".to_string(),
            method: PaymentMethod::Paystack,
            metadata: CheckoutMetadata {
                event_id: "evt-1".to_string(),
                buyer: Buyer::Guest,
                quantity: 2,
                lines: vec![OrderLine {
                    name: "Regular".to_string(),
                    price: Decimal::new(5000, 2),
                    quantity: 2,
                }],
                buyer_email: "ada@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Obi".to_string(),
            },
        }
    }

    fn app_code(err: ServiceError) -> ErrorCode {
        match err {
            ServiceError::App(e) => e.code,
            ServiceError::Db(e) => panic!("unexpected db error: {}", e),
        }
    }

    #[tokio::test]
    async fn test_checkout_unknown_event() {
        let rec = reconciler(MemoryStore::default(), RecordingMailer::default());
        let err = rec.initiate_checkout(&checkout_request()).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::EventNotFound);
    }

    #[tokio::test]
    async fn test_checkout_draft_event_rejected() {
        let store = MemoryStore::default();
        let mut event = paid_event();
        event.status = EventStatus::Draft;
        store.events.insert(event.id.clone(), event);
        store.users.insert("usr-org".to_string(), organizer(true));

        let rec = reconciler(store, RecordingMailer::default());
        let err = rec.initiate_checkout(&checkout_request()).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::EventNotPublished);
    }

    #[tokio::test]
    async fn test_checkout_missing_payout_account() {
        let store = MemoryStore::default();
        store.events.insert("evt-1".to_string(), paid_event());
        store.users.insert("usr-org".to_string(), organizer(false));

        let rec = reconciler(store, RecordingMailer::default());
        let err = rec.initiate_checkout(&checkout_request()).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::PayoutAccountMissing);
    }

    #[tokio::test]
    async fn test_checkout_currency_mismatch() {
        let store = MemoryStore::default();
        store.events.insert("evt-1".to_string(), paid_event());
        store.users.insert("usr-org".to_string(), organizer(true));

        let rec = reconciler(store, RecordingMailer::default());
        let mut req = checkout_request();
        req.currency = "USD".to_string();
        let err = rec.initiate_checkout(&req).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn test_checkout_zero_quantity() {
        let store = MemoryStore::default();
        store.events.insert("evt-1".to_string(), paid_event());
        store.users.insert("usr-org".to_string(), organizer(true));

        let rec = reconciler(store, RecordingMailer::default());
        let mut req = checkout_request();
        req.quantity = 0;
        let err = rec.initiate_checkout(&req).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn test_checkout_negative_price() {
        let store = MemoryStore::default();
        store.events.insert("evt-1".to_string(), paid_event());
        store.users.insert("usr-org".to_string(), organizer(true));

        let rec = reconciler(store, RecordingMailer::default());
        let mut req = checkout_request();
        req.price = Decimal::new(-100, 2);
        let err = rec.initiate_checkout(&req).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn test_checkout_method_provider_mismatch() {
        let store = MemoryStore::default();
        store.events.insert("evt-1".to_string(), paid_event());
        store.users.insert("usr-org".to_string(), organizer(true));

        let rec = reconciler(store, RecordingMailer::default());
        let mut req = checkout_request();
        // NGN event in Nigeria routes to the local provider
        req.payment_method = Some(PaymentMethod::Card);
        let err = rec.initiate_checkout(&req).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn test_checkout_unknown_buyer() {
        let store = MemoryStore::default();
        store.events.insert("evt-1".to_string(), paid_event());
        store.users.insert("usr-org".to_string(), organizer(true));

        let rec = reconciler(store, RecordingMailer::default());
        let mut req = checkout_request();
        req.buyer_id = Some("usr-ghost".to_string());
        let err = rec.initiate_checkout(&req).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::UserNotFound);
    }

    #[tokio::test]
    async fn test_free_event_checkout_materializes_immediately() {
        let store = MemoryStore::default();
        store.events.insert("evt-free".to_string(), free_event());
        store.users.insert("usr-org".to_string(), organizer(false));

        let mailer = RecordingMailer::default();
        let sent = mailer.sent.clone();
        let rec = reconciler(store, mailer);

        let mut req = checkout_request();
        req.event_id = "evt-free".to_string();
        req.price = Decimal::ZERO;
        req.price_categories = Vec::new();
        req.payment_method = None;

        let outcome = rec.initiate_checkout(&req).await.unwrap();
        let order = match outcome {
            CheckoutOutcome::Free { order } => order,
            other => panic!("expected free outcome, got {:?}", other),
        };

        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert_eq!(order.payment_method, PaymentMethod::None);
        assert_eq!(order.total_amount, "0.00");
        assert!(order.reference.starts_with("INT-evt-free-"));
        assert_eq!(sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_record_completed_charge_creates_once() {
        let store = MemoryStore::default();
        store.events.insert("evt-1".to_string(), paid_event());

        let mailer = RecordingMailer::default();
        let sent = mailer.sent.clone();
        let rec = reconciler(store, mailer);

        let charge = completed_charge();
        let (order, outcome) = rec.record_completed_charge(&charge).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);
        assert_eq!(order.total_amount, "100.00");
        assert_eq!(order.currency, "NGN");
        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert_eq!(order.buyer_id, None);

        // duplicate delivery
        let (_, outcome) = rec.record_completed_charge(&charge).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_record_completed_charge_missing_event() {
        let rec = reconciler(MemoryStore::default(), RecordingMailer::default());
        let mut charge = completed_charge();
        charge.metadata.event_id = "evt-gone".to_string();
        let err = rec.record_completed_charge(&charge).await.unwrap_err();
        assert_eq!(app_code(err), ErrorCode::EventNotFound);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_record_completed_charge_concurrent_deliveries() {
        for n in [2usize, 10] {
            let store = MemoryStore::default();
            store.events.insert("evt-1".to_string(), paid_event());

            let mailer = RecordingMailer::default();
            let sent = mailer.sent.clone();
            let rec = Arc::new(reconciler(store, mailer));

            let charge = completed_charge();
            let tasks: Vec<_> = (0..n)
                .map(|_| {
                    let rec = rec.clone();
                    let charge = charge.clone();
                    tokio::spawn(async move { rec.record_completed_charge(&charge).await })
                })
                .collect();

            let mut created = 0;
            for task in futures::future::join_all(tasks).await {
                let (_, outcome) = task.unwrap().unwrap();
                if outcome == UpsertOutcome::Created {
                    created += 1;
                }
            }

            assert_eq!(created, 1, "exactly one delivery creates the order (n={})", n);
            assert_eq!(sent.load(Ordering::SeqCst), 1, "email sent once (n={})", n);
        }
    }
}
