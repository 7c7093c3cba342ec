//! User queries

use shared::models::User;
use sqlx::PgPool;

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub subaccount_code: Option<String>,
    pub stripe_account_id: Option<String>,
    pub created_at: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            subaccount_code: row.subaccount_code,
            stripe_account_id: row.stripe_account_id,
            created_at: row.created_at,
        }
    }
}

pub async fn insert(pool: &PgPool, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, first_name, last_name, subaccount_code, stripe_account_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.subaccount_code)
    .bind(&user.stripe_account_id)
    .bind(user.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(User::from))
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(User::from))
}

/// Set payout identifiers. Returns the number of rows touched so callers can
/// distinguish a missing user.
pub async fn update_payout(
    pool: &PgPool,
    id: &str,
    subaccount_code: Option<&str>,
    stripe_account_id: Option<&str>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET subaccount_code = COALESCE($2, subaccount_code),
            stripe_account_id = COALESCE($3, stripe_account_id)
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(subaccount_code)
    .bind(stripe_account_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
