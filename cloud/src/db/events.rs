//! Event queries

use shared::models::{Event, EventStatus, PriceCategory};
use sqlx::PgPool;
use sqlx::types::Json;

#[derive(Debug, sqlx::FromRow)]
pub struct EventRow {
    pub id: String,
    pub organizer_id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub currency: String,
    pub is_free: bool,
    pub price_categories: Json<Vec<PriceCategory>>,
    pub status: String,
    pub created_at: i64,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            organizer_id: row.organizer_id,
            title: row.title,
            subtitle: row.subtitle,
            description: row.description,
            location: row.location,
            currency: row.currency,
            is_free: row.is_free,
            price_categories: row.price_categories.0,
            // column is CHECK-constrained to valid values
            status: EventStatus::from_db(&row.status).unwrap_or(EventStatus::Draft),
            created_at: row.created_at,
        }
    }
}

pub async fn insert(pool: &PgPool, event: &Event) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO events (id, organizer_id, title, subtitle, description, location,
                            currency, is_free, price_categories, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(&event.id)
    .bind(&event.organizer_id)
    .bind(&event.title)
    .bind(&event.subtitle)
    .bind(&event.description)
    .bind(&event.location)
    .bind(&event.currency)
    .bind(event.is_free)
    .bind(Json(&event.price_categories))
    .bind(event.status.as_db())
    .bind(event.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Event>, sqlx::Error> {
    let row: Option<EventRow> = sqlx::query_as("SELECT * FROM events WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Event::from))
}

pub async fn set_status(
    pool: &PgPool,
    id: &str,
    status: EventStatus,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE events SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_db())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
