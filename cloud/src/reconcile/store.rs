//! Order store abstraction
//!
//! The reconciler reads events and users and writes completed orders
//! through this trait. Production uses Postgres; tests use an in-memory
//! store to exercise concurrent webhook delivery.

use async_trait::async_trait;
use shared::models::{Event, Order, User};
use sqlx::PgPool;

use crate::db;
use crate::error::BoxError;

/// Result of materializing a completed charge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First delivery for this reference: a new order row was created
    Created,
    /// Duplicate delivery: the existing order was marked completed
    Updated,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_event(&self, id: &str) -> Result<Option<Event>, BoxError>;
    async fn find_user(&self, id: &str) -> Result<Option<User>, BoxError>;
    async fn upsert_completed_order(&self, order: &Order) -> Result<UpsertOutcome, BoxError>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn find_event(&self, id: &str) -> Result<Option<Event>, BoxError> {
        Ok(db::events::find_by_id(&self.pool, id).await?)
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, BoxError> {
        Ok(db::users::find_by_id(&self.pool, id).await?)
    }

    async fn upsert_completed_order(&self, order: &Order) -> Result<UpsertOutcome, BoxError> {
        let created = db::orders::upsert_completed(&self.pool, order).await?;
        Ok(if created {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        })
    }
}

#[cfg(test)]
pub mod memory {
    //! In-memory store keyed by reference, safe under concurrent upserts

    use super::*;
    use dashmap::DashMap;
    use dashmap::mapref::entry::Entry;
    use shared::models::PaymentStatus;

    #[derive(Default)]
    pub struct MemoryStore {
        pub events: DashMap<String, Event>,
        pub users: DashMap<String, User>,
        pub orders_by_reference: DashMap<String, Order>,
    }

    #[async_trait]
    impl OrderStore for MemoryStore {
        async fn find_event(&self, id: &str) -> Result<Option<Event>, BoxError> {
            Ok(self.events.get(id).map(|e| e.clone()))
        }

        async fn find_user(&self, id: &str) -> Result<Option<User>, BoxError> {
            Ok(self.users.get(id).map(|u| u.clone()))
        }

        async fn upsert_completed_order(&self, order: &Order) -> Result<UpsertOutcome, BoxError> {
            // entry() holds the shard lock, so racing upserts for one
            // reference serialize here just like the unique index does
            match self.orders_by_reference.entry(order.reference.clone()) {
                Entry::Occupied(mut occupied) => {
                    occupied.get_mut().payment_status = PaymentStatus::Completed;
                    Ok(UpsertOutcome::Updated)
                }
                Entry::Vacant(vacant) => {
                    let mut stored = order.clone();
                    stored.payment_status = PaymentStatus::Completed;
                    vacant.insert(stored);
                    Ok(UpsertOutcome::Created)
                }
            }
        }
    }
}
