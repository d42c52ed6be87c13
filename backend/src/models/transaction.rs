use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// A single purchase lot owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub company_name: Option<String>,
    pub quantity: i32,
    pub purchase_price: BigDecimal,
    pub current_price: Option<BigDecimal>,
    pub total_value: Option<BigDecimal>,
    pub gain_loss: Option<BigDecimal>,
    pub gain_loss_percent: Option<BigDecimal>,
    pub purchase_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Amount paid for the lot.
    pub fn cost_basis(&self) -> BigDecimal {
        &self.purchase_price * &BigDecimal::from(self.quantity)
    }

    pub fn apply_metrics(&mut self, metrics: &LotMetrics) {
        self.current_price = Some(metrics.current_price.clone());
        self.total_value = Some(metrics.total_value.clone());
        self.gain_loss = Some(metrics.gain_loss.clone());
        self.gain_loss_percent = Some(metrics.gain_loss_percent.clone());
    }
}

/// Request body for `POST /api/portfolio/stocks`.
///
/// Every field is optional at the wire level so that missing input is reported
/// as a validation failure instead of a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransaction {
    pub symbol: Option<String>,
    pub quantity: Option<i64>,
    pub purchase_price: Option<f64>,
    pub purchase_date: Option<String>,
}

/// Row handed to the ledger store on insert.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub symbol: String,
    pub company_name: Option<String>,
    pub quantity: i32,
    pub purchase_price: BigDecimal,
    pub metrics: LotMetrics,
    pub purchase_date: NaiveDate,
}

/// Market-dependent fields of a lot, recomputed on every valuation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LotMetrics {
    pub current_price: BigDecimal,
    pub total_value: BigDecimal,
    pub gain_loss: BigDecimal,
    pub gain_loss_percent: BigDecimal,
}

impl LotMetrics {
    pub fn compute(purchase_price: &BigDecimal, quantity: i32, current_price: &BigDecimal) -> Self {
        let qty = BigDecimal::from(quantity);
        let total_value = current_price * &qty;
        let gain_loss = &total_value - &(purchase_price * &qty);
        let gain_loss_percent = percent_change(purchase_price, current_price);

        Self {
            current_price: current_price.clone(),
            total_value,
            gain_loss,
            gain_loss_percent,
        }
    }
}

/// `(to - from) / from * 100`, rounded to 4 places. Zero when `from` is zero.
pub(crate) fn percent_change(from: &BigDecimal, to: &BigDecimal) -> BigDecimal {
    let zero = BigDecimal::from(0);
    if *from == zero {
        return zero;
    }
    ((to - from) / from * BigDecimal::from(100)).round(4)
}
