use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::transaction::{percent_change, Transaction};

// The per-user rollup row, overwritten wholesale after every valuation pass.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PortfolioSnapshot {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_value: BigDecimal,
    pub total_gain_loss: BigDecimal,
    pub total_gain_loss_percent: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioTotals {
    pub total_value: BigDecimal,
    pub total_invested: BigDecimal,
    pub total_gain_loss: BigDecimal,
    pub total_gain_loss_percent: BigDecimal,
}

impl PortfolioTotals {
    /// Aggregates lots as they currently stand. A lot that has never been
    /// valued contributes nothing to the total value but still counts as invested.
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let zero = BigDecimal::from(0);

        let total_value = transactions
            .iter()
            .fold(zero.clone(), |acc, t| acc + t.total_value.as_ref().unwrap_or(&zero));
        let total_invested = transactions
            .iter()
            .fold(zero.clone(), |acc, t| acc + t.cost_basis());
        let total_gain_loss = &total_value - &total_invested;

        let total_gain_loss_percent = if total_invested > zero {
            percent_change(&total_invested, &total_value)
        } else {
            zero
        };

        Self {
            total_value,
            total_invested,
            total_gain_loss,
            total_gain_loss_percent,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_value: BigDecimal,
    pub total_invested: BigDecimal,
    pub total_gain_loss: BigDecimal,
    pub total_gain_loss_percent: BigDecimal,
    pub number_of_stocks: usize,
    pub updated_at: DateTime<Utc>,
}

impl PortfolioSummary {
    pub fn new(totals: PortfolioTotals, number_of_stocks: usize, updated_at: DateTime<Utc>) -> Self {
        Self {
            total_value: totals.total_value,
            total_invested: totals.total_invested,
            total_gain_loss: totals.total_gain_loss,
            total_gain_loss_percent: totals.total_gain_loss_percent,
            number_of_stocks,
            updated_at,
        }
    }
}

/// Response of `GET /api/portfolio`.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioView {
    pub transactions: Vec<Transaction>,
    pub summary: PortfolioSummary,
}
