use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{LotMetrics, NewTransaction, Transaction};

const COLUMNS: &str = "id, user_id, symbol, company_name, quantity, purchase_price, current_price, \
                       total_value, gain_loss, gain_loss_percent, purchase_date, created_at";

pub async fn fetch_all(pool: &PgPool, user_id: Uuid) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {COLUMNS} FROM transactions
         WHERE user_id = $1
         ORDER BY purchase_date DESC, created_at DESC"
    ))
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn fetch_one(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {COLUMNS} FROM transactions WHERE id = $1 AND user_id = $2"
    ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn insert(pool: &PgPool, input: NewTransaction) -> Result<Transaction, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "INSERT INTO transactions
            (id, user_id, symbol, company_name, quantity, purchase_price,
             current_price, total_value, gain_loss, gain_loss_percent, purchase_date)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING {COLUMNS}"
    ))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.symbol)
        .bind(input.company_name)
        .bind(input.quantity)
        .bind(input.purchase_price)
        .bind(input.metrics.current_price)
        .bind(input.metrics.total_value)
        .bind(input.metrics.gain_loss)
        .bind(input.metrics.gain_loss_percent)
        .bind(input.purchase_date)
        .fetch_one(pool)
        .await
}

pub async fn update_metrics(
    pool: &PgPool,
    id: Uuid,
    metrics: &LotMetrics,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE transactions
         SET current_price = $2, total_value = $3, gain_loss = $4, gain_loss_percent = $5
         WHERE id = $1",
    )
        .bind(id)
        .bind(&metrics.current_price)
        .bind(&metrics.total_value)
        .bind(&metrics.gain_loss)
        .bind(&metrics.gain_loss_percent)
        .execute(pool)
        .await?;
    Ok(())
}

/// Ownership check and delete in one statement.
pub async fn delete_owned(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "DELETE FROM transactions WHERE id = $1 AND user_id = $2 RETURNING {COLUMNS}"
    ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}
