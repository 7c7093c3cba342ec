//! Order queries
//!
//! `upsert_completed` is the idempotency point for webhook delivery: the
//! insert races on the unique reference index and loses cleanly.

use shared::models::{Order, OrderLine, PaymentMethod, PaymentStatus};
use sqlx::PgPool;
use sqlx::types::Json;

#[derive(Debug, sqlx::FromRow)]
pub struct OrderRow {
    pub id: String,
    pub event_id: String,
    pub buyer_id: Option<String>,
    pub buyer_email: String,
    pub first_name: String,
    pub last_name: String,
    pub total_amount: String,
    pub currency: String,
    pub payment_method: String,
    pub quantity: i32,
    pub price_categories: Json<Vec<OrderLine>>,
    pub reference: String,
    pub payment_status: String,
    pub created_at: i64,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            event_id: row.event_id,
            buyer_id: row.buyer_id,
            buyer_email: row.buyer_email,
            first_name: row.first_name,
            last_name: row.last_name,
            total_amount: row.total_amount,
            currency: row.currency,
            // columns are CHECK-constrained to valid values
            payment_method: PaymentMethod::from_db(&row.payment_method)
                .unwrap_or(PaymentMethod::None),
            quantity: row.quantity.max(0) as u32,
            price_categories: row.price_categories.0,
            reference: row.reference,
            payment_status: PaymentStatus::from_db(&row.payment_status)
                .unwrap_or(PaymentStatus::Pending),
            created_at: row.created_at,
        }
    }
}

/// Insert a completed order, or mark the existing order for the same
/// reference completed. Returns `true` when this call created the row.
pub async fn upsert_completed(pool: &PgPool, order: &Order) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO orders (id, event_id, buyer_id, buyer_email, first_name, last_name,
                            total_amount, currency, payment_method, quantity,
                            price_categories, reference, payment_status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'completed', $13)
        ON CONFLICT (reference) DO NOTHING
        "#,
    )
    .bind(&order.id)
    .bind(&order.event_id)
    .bind(&order.buyer_id)
    .bind(&order.buyer_email)
    .bind(&order.first_name)
    .bind(&order.last_name)
    .bind(&order.total_amount)
    .bind(&order.currency)
    .bind(order.payment_method.as_db())
    .bind(order.quantity as i32)
    .bind(Json(&order.price_categories))
    .bind(&order.reference)
    .bind(order.created_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        // Duplicate delivery: ensure the earlier row is marked completed.
        sqlx::query("UPDATE orders SET payment_status = 'completed' WHERE reference = $1")
            .bind(&order.reference)
            .execute(pool)
            .await?;
        return Ok(false);
    }
    Ok(true)
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Order>, sqlx::Error> {
    let row: Option<OrderRow> = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Order::from))
}

pub async fn find_by_reference(
    pool: &PgPool,
    reference: &str,
) -> Result<Option<Order>, sqlx::Error> {
    let row: Option<OrderRow> = sqlx::query_as("SELECT * FROM orders WHERE reference = $1")
        .bind(reference)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Order::from))
}
