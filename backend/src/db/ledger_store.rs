use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{portfolio_queries, transaction_queries};
use crate::models::{LotMetrics, NewTransaction, PortfolioSnapshot, PortfolioTotals, Transaction};

/// Persistence the valuation pipeline needs. Every lookup that takes a
/// `user_id` only ever sees rows owned by that user.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Newest purchase first.
    async fn list_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, sqlx::Error>;

    async fn find_transaction(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Transaction>, sqlx::Error>;

    async fn insert_transaction(&self, input: NewTransaction) -> Result<Transaction, sqlx::Error>;

    async fn update_transaction_metrics(
        &self,
        id: Uuid,
        metrics: &LotMetrics,
    ) -> Result<(), sqlx::Error>;

    /// Deletes the row only if it belongs to `user_id`, atomically.
    /// Returns the removed row, or `None` when nothing matched.
    async fn delete_transaction(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Transaction>, sqlx::Error>;

    async fn upsert_portfolio_summary(
        &self,
        user_id: Uuid,
        totals: &PortfolioTotals,
        updated_at: DateTime<Utc>,
    ) -> Result<PortfolioSnapshot, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn list_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, sqlx::Error> {
        transaction_queries::fetch_all(&self.pool, user_id).await
    }

    async fn find_transaction(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        transaction_queries::fetch_one(&self.pool, id, user_id).await
    }

    async fn insert_transaction(&self, input: NewTransaction) -> Result<Transaction, sqlx::Error> {
        transaction_queries::insert(&self.pool, input).await
    }

    async fn update_transaction_metrics(
        &self,
        id: Uuid,
        metrics: &LotMetrics,
    ) -> Result<(), sqlx::Error> {
        transaction_queries::update_metrics(&self.pool, id, metrics).await
    }

    async fn delete_transaction(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        transaction_queries::delete_owned(&self.pool, id, user_id).await
    }

    async fn upsert_portfolio_summary(
        &self,
        user_id: Uuid,
        totals: &PortfolioTotals,
        updated_at: DateTime<Utc>,
    ) -> Result<PortfolioSnapshot, sqlx::Error> {
        portfolio_queries::upsert(&self.pool, user_id, totals, updated_at).await
    }
}
