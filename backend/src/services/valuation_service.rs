use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::try_join_all;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::LedgerStore;
use crate::errors::AppError;
use crate::models::{
    CreateTransaction, HistoricalPoint, HistoryPeriod, LotMetrics, NewTransaction, PerformancePoint, PortfolioSummary,
    PortfolioTotals, PortfolioView, Quote, Transaction,
};
use crate::services::clock::Clock;
use crate::services::quote_cache::QuoteCache;
use crate::services::quote_service::{normalize_symbol, MarketDataError, QuoteService};

const MAX_SYMBOL_LEN: usize = 16;

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq)]
struct ValidatedLot {
    symbol: String,
    quantity: i32,
    purchase_price: BigDecimal,
    purchase_date: NaiveDate,
}

/// Values a user's ledger against live quotes and keeps the rollup row current.
pub struct ValuationService {
    store: Arc<dyn LedgerStore>,
    quotes: Arc<QuoteService>,
    cache: Arc<QuoteCache>,
    clock: Arc<dyn Clock>,
    max_concurrency: usize,
}

impl ValuationService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        quotes: Arc<QuoteService>,
        cache: Arc<QuoteCache>,
        clock: Arc<dyn Clock>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            store,
            quotes,
            cache,
            clock,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Re-price every lot, persist the refreshed metrics and rollup, and return both.
    ///
    /// A symbol whose quote cannot be obtained keeps its last stored values; it
    /// never fails the request.
    pub async fn refresh_and_summarize(&self, user_id: Uuid) -> Result<PortfolioView, AppError> {
        let mut transactions = self.store.list_transactions(user_id).await.map_err(|e| {
            error!("Failed to load transactions for user {}: {}", user_id, e);
            AppError::Db(e)
        })?;

        let symbols: BTreeSet<String> = transactions
            .iter()
            .map(|t| normalize_symbol(&t.symbol))
            .collect();
        let symbol_count = symbols.len();
        let quotes = self.lookup_quotes(symbols).await;

        let mut updates: Vec<(Uuid, LotMetrics)> = Vec::new();
        for transaction in transactions.iter_mut() {
            let Some(quote) = quotes.get(&normalize_symbol(&transaction.symbol)) else {
                continue;
            };
            let Some(price) = to_decimal(quote.current_price) else {
                continue;
            };

            let metrics = LotMetrics::compute(&transaction.purchase_price, transaction.quantity, &price);
            transaction.apply_metrics(&metrics);
            transaction.company_name = Some(quote.company_name.clone());
            updates.push((transaction.id, metrics));
        }

        // Write back only after every lookup resolved, so the rollup matches storage.
        try_join_all(
            updates
                .iter()
                .map(|(id, metrics)| self.store.update_transaction_metrics(*id, metrics)),
        )
        .await
        .map_err(|e| {
            error!("Failed to persist lot metrics for user {}: {}", user_id, e);
            AppError::Db(e)
        })?;

        let totals = PortfolioTotals::from_transactions(&transactions);
        let snapshot = self
            .store
            .upsert_portfolio_summary(user_id, &totals, self.clock.now())
            .await
            .map_err(|e| {
                error!("Failed to persist portfolio summary for user {}: {}", user_id, e);
                AppError::Db(e)
            })?;

        info!(
            "Valued {} lots for user {} ({} of {} symbols priced)",
            transactions.len(),
            user_id,
            quotes.len(),
            symbol_count,
        );

        let summary = PortfolioSummary::new(totals, transactions.len(), snapshot.updated_at);
        Ok(PortfolioView { transactions, summary })
    }

    /// One cached lookup per symbol, run concurrently. Failures are logged and dropped.
    async fn lookup_quotes(&self, symbols: BTreeSet<String>) -> HashMap<String, Quote> {
        let results: Vec<(String, Result<Quote, MarketDataError>)> = stream::iter(symbols)
            .map(|symbol| {
                let cache = Arc::clone(&self.cache);
                async move {
                    let result = cache.get_or_fetch(&symbol).await;
                    (symbol, result)
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut quotes = HashMap::with_capacity(results.len());
        for (symbol, result) in results {
            match result {
                Ok(quote) => {
                    quotes.insert(symbol, quote);
                }
                Err(e) => warn!("Keeping stored values for {}: {}", symbol, e),
            }
        }
        quotes
    }

    /// Record a new purchase lot, seeded from a fresh quote.
    pub async fn add_lot(
        &self,
        user_id: Uuid,
        input: CreateTransaction,
    ) -> Result<Transaction, AppError> {
        let lot = validate_lot(input, self.clock.now())?;

        let quote = self.quotes.fetch_quote(&lot.symbol).await?;
        let price = to_decimal(quote.current_price)
            .ok_or_else(|| MarketDataError::QuoteUnavailable(quote.symbol.clone()))?;
        let metrics = LotMetrics::compute(&lot.purchase_price, lot.quantity, &price);

        let transaction = self
            .store
            .insert_transaction(NewTransaction {
                user_id,
                symbol: quote.symbol.clone(),
                company_name: Some(quote.company_name.clone()),
                quantity: lot.quantity,
                purchase_price: lot.purchase_price,
                metrics,
                purchase_date: lot.purchase_date,
            })
            .await
            .map_err(|e| {
                error!("Failed to insert {} lot for user {}: {}", lot.symbol, user_id, e);
                AppError::Db(e)
            })?;

        self.cache.store(quote);
        info!("Stock added: {} x{} for user {}", transaction.symbol, transaction.quantity, user_id);
        Ok(transaction)
    }

    pub async fn get_lot(&self, user_id: Uuid, id: Uuid) -> Result<Transaction, AppError> {
        self.store
            .find_transaction(id, user_id)
            .await?
            .ok_or_else(not_found)
    }

    /// Delete a lot owned by `user_id`. Absent and foreign rows look the same.
    pub async fn remove_lot(&self, user_id: Uuid, id: Uuid) -> Result<Transaction, AppError> {
        let removed = self.store.delete_transaction(id, user_id).await.map_err(|e| {
            error!("Failed to delete transaction {}: {}", id, e);
            AppError::Db(e)
        })?;

        match removed {
            Some(transaction) => {
                info!("Stock removed: {} ({}) for user {}", transaction.symbol, id, user_id);
                Ok(transaction)
            }
            None => Err(not_found()),
        }
    }

    /// Daily portfolio value over `period`, oldest first.
    ///
    /// Each date sums close × held quantity over the symbols that have a bar on
    /// that date; there is no alignment across symbols.
    pub async fn performance_series(
        &self,
        user_id: Uuid,
        period: HistoryPeriod,
    ) -> Result<Vec<PerformancePoint>, AppError> {
        let transactions = self.store.list_transactions(user_id).await?;
        if transactions.is_empty() {
            return Ok(Vec::new());
        }

        let mut holdings: BTreeMap<String, i64> = BTreeMap::new();
        for t in &transactions {
            *holdings.entry(normalize_symbol(&t.symbol)).or_insert(0) += i64::from(t.quantity);
        }

        let series: Vec<(i64, Vec<HistoricalPoint>)> = stream::iter(holdings)
            .map(|(symbol, quantity)| {
                let quotes = Arc::clone(&self.quotes);
                async move {
                    quotes
                        .fetch_history(&symbol, period)
                        .await
                        .map(|points| (quantity, points))
                }
            })
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (quantity, points) in series {
            for point in points {
                *by_date.entry(point.date).or_insert(0.0) += point.close * quantity as f64;
            }
        }

        Ok(by_date
            .into_iter()
            .map(|(date, value)| PerformancePoint { date, value })
            .collect())
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Transaction not found or access denied".to_string())
}

fn to_decimal(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    value.to_string().parse::<BigDecimal>().ok()
}

fn parse_purchase_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

fn validate_lot(input: CreateTransaction, now: DateTime<Utc>) -> Result<ValidatedLot, AppError> {
    let invalid = |msg: &str| AppError::Validation(msg.to_string());

    let (Some(symbol), Some(quantity), Some(purchase_price), Some(purchase_date)) = (
        input.symbol,
        input.quantity,
        input.purchase_price,
        input.purchase_date,
    ) else {
        return Err(invalid("All fields are required"));
    };

    let symbol = normalize_symbol(&symbol);
    if symbol.is_empty() {
        return Err(invalid("Symbol is required"));
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(invalid("Symbol is too long"));
    }

    if quantity <= 0 {
        return Err(invalid("Quantity must be greater than 0"));
    }
    let quantity = i32::try_from(quantity).map_err(|_| invalid("Quantity is too large"))?;

    if !purchase_price.is_finite() || purchase_price <= 0.0 {
        return Err(invalid("Purchase price must be greater than 0"));
    }
    let purchase_price =
        to_decimal(purchase_price).ok_or_else(|| invalid("Purchase price must be greater than 0"))?;

    let purchase_date = parse_purchase_date(&purchase_date)
        .filter(|d| *d <= now.date_naive())
        .ok_or_else(|| invalid("Invalid purchase date"))?;

    Ok(ValidatedLot {
        symbol,
        quantity,
        purchase_price,
        purchase_date,
    })
}
