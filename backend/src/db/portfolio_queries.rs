use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{PortfolioSnapshot, PortfolioTotals};

pub async fn upsert(
    pool: &PgPool,
    user_id: Uuid,
    totals: &PortfolioTotals,
    updated_at: DateTime<Utc>,
) -> Result<PortfolioSnapshot, sqlx::Error> {
    sqlx::query_as::<_, PortfolioSnapshot>(
        "INSERT INTO portfolio (id, user_id, total_value, total_gain_loss, total_gain_loss_percent, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (user_id) DO UPDATE
         SET total_value = EXCLUDED.total_value,
             total_gain_loss = EXCLUDED.total_gain_loss,
             total_gain_loss_percent = EXCLUDED.total_gain_loss_percent,
             updated_at = EXCLUDED.updated_at
         RETURNING id, user_id, total_value, total_gain_loss, total_gain_loss_percent, updated_at",
    )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&totals.total_value)
        .bind(&totals.total_gain_loss)
        .bind(&totals.total_gain_loss_percent)
        .bind(updated_at)
        .fetch_one(pool)
        .await
}
