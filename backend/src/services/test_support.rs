use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;

use crate::external::price_provider::{
    ExternalPricePoint, ExternalQuote, ExternalTickerMatch, PriceProvider, PriceProviderError,
};

pub(crate) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 15, 0, 0).unwrap()
}

/// Canned provider that records every call it receives.
#[derive(Default)]
pub(crate) struct StubProvider {
    prices: Mutex<HashMap<String, f64>>,
    history: HashMap<String, Vec<(NaiveDate, f64)>>,
    matches: Vec<ExternalTickerMatch>,
    failing: HashSet<String>,
    requested: Mutex<Vec<String>>,
    pub quote_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(self, symbol: &str, price: f64) -> Self {
        self.prices.lock().insert(symbol.to_string(), price);
        self
    }

    pub fn with_history(mut self, symbol: &str, points: Vec<(NaiveDate, f64)>) -> Self {
        self.history.insert(symbol.to_string(), points);
        self
    }

    pub fn with_matches(mut self, matches: Vec<ExternalTickerMatch>) -> Self {
        self.matches = matches;
        self
    }

    pub fn failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices.lock().insert(symbol.to_string(), price);
    }

    pub fn requested_symbols(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl PriceProvider for StubProvider {
    async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, PriceProviderError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(symbol.to_string());

        if self.failing.contains(symbol) {
            return Err(PriceProviderError::Network("connection reset".into()));
        }
        let price = self
            .prices
            .lock()
            .get(symbol)
            .copied()
            .ok_or(PriceProviderError::NotFound)?;

        Ok(ExternalQuote {
            symbol: Some(symbol.to_string()),
            long_name: Some(format!("{} Corp", symbol)),
            price: Some(price),
            ..Default::default()
        })
    }

    async fn fetch_daily_history(
        &self,
        symbol: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(symbol) {
            return Err(PriceProviderError::RateLimited);
        }
        let points = self.history.get(symbol).ok_or(PriceProviderError::NotFound)?;

        Ok(points
            .iter()
            .map(|(date, close)| ExternalPricePoint {
                date: *date,
                open: None,
                high: None,
                low: None,
                close: *close,
                volume: None,
            })
            .collect())
    }

    async fn search(&self, _query: &str) -> Result<Vec<ExternalTickerMatch>, PriceProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.matches.clone())
    }
}
