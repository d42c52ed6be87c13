use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::db::ledger_store::LedgerStore;
use crate::models::{LotMetrics, NewTransaction, PortfolioSnapshot, PortfolioTotals, Transaction};

/// Ledger kept in process memory, for tests. The server always runs on Postgres.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    transactions: RwLock<Vec<Transaction>>,
    portfolios: RwLock<HashMap<Uuid, PortfolioSnapshot>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row verbatim, bypassing valuation.
    pub fn seed(&self, transaction: Transaction) {
        self.transactions.write().push(transaction);
    }

    pub fn get(&self, id: Uuid) -> Option<Transaction> {
        self.transactions.read().iter().find(|t| t.id == id).cloned()
    }

    /// The last rollup written for `user_id`.
    pub fn summary(&self, user_id: Uuid) -> Option<PortfolioSnapshot> {
        self.portfolios.read().get(&user_id).cloned()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn list_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, sqlx::Error> {
        let mut rows: Vec<Transaction> = self
            .transactions
            .read()
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.purchase_date
                .cmp(&a.purchase_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(rows)
    }

    async fn find_transaction(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        Ok(self
            .transactions
            .read()
            .iter()
            .find(|t| t.id == id && t.user_id == user_id)
            .cloned())
    }

    async fn insert_transaction(&self, input: NewTransaction) -> Result<Transaction, sqlx::Error> {
        let row = Transaction {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            symbol: input.symbol,
            company_name: input.company_name,
            quantity: input.quantity,
            purchase_price: input.purchase_price,
            current_price: Some(input.metrics.current_price),
            total_value: Some(input.metrics.total_value),
            gain_loss: Some(input.metrics.gain_loss),
            gain_loss_percent: Some(input.metrics.gain_loss_percent),
            purchase_date: input.purchase_date,
            created_at: Utc::now(),
        };
        self.transactions.write().push(row.clone());
        Ok(row)
    }

    async fn update_transaction_metrics(
        &self,
        id: Uuid,
        metrics: &LotMetrics,
    ) -> Result<(), sqlx::Error> {
        if let Some(row) = self.transactions.write().iter_mut().find(|t| t.id == id) {
            row.apply_metrics(metrics);
        }
        Ok(())
    }

    async fn delete_transaction(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        // Single write lock covers both the ownership check and the removal.
        let mut rows = self.transactions.write();
        let position = rows.iter().position(|t| t.id == id && t.user_id == user_id);
        Ok(position.map(|i| rows.remove(i)))
    }

    async fn upsert_portfolio_summary(
        &self,
        user_id: Uuid,
        totals: &PortfolioTotals,
        updated_at: DateTime<Utc>,
    ) -> Result<PortfolioSnapshot, sqlx::Error> {
        let mut portfolios = self.portfolios.write();
        let id = portfolios.get(&user_id).map(|p| p.id).unwrap_or_else(Uuid::new_v4);
        let snapshot = PortfolioSnapshot {
            id,
            user_id,
            total_value: totals.total_value.clone(),
            total_gain_loss: totals.total_gain_loss.clone(),
            total_gain_loss_percent: totals.total_gain_loss_percent.clone(),
            updated_at,
        };
        portfolios.insert(user_id, snapshot.clone());
        Ok(snapshot)
    }
}
