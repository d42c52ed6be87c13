use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::external::price_provider::{PriceProvider, PriceProviderError};
use crate::models::{HistoricalPoint, HistoryPeriod, Quote, TickerMatch};
use crate::services::clock::Clock;

const MAX_SEARCH_RESULTS: usize = 10;

/// What callers outside this module learn when market data cannot be obtained.
/// Provider errors are logged here and never passed on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketDataError {
    #[error("Unable to fetch stock data for {0}")]
    QuoteUnavailable(String),

    #[error("Unable to fetch historical data for {0}")]
    HistoryUnavailable(String),

    #[error("Unable to search stocks")]
    SearchUnavailable,
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Adapter between the raw provider and the rest of the service.
pub struct QuoteService {
    provider: Arc<dyn PriceProvider>,
    clock: Arc<dyn Clock>,
}

impl QuoteService {
    pub fn new(provider: Arc<dyn PriceProvider>, clock: Arc<dyn Clock>) -> Self {
        Self { provider, clock }
    }

    pub async fn fetch_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let symbol = normalize_symbol(symbol);

        let raw = self.provider.fetch_quote(&symbol).await.map_err(|e| {
            log_provider_error("quote", &symbol, &e);
            MarketDataError::QuoteUnavailable(symbol.clone())
        })?;

        let price = match raw.price {
            Some(p) if p.is_finite() && p > 0.0 => p,
            _ => {
                warn!("No price data available for {}", symbol);
                return Err(MarketDataError::QuoteUnavailable(symbol));
            }
        };

        let canonical = raw
            .symbol
            .map(|s| normalize_symbol(&s))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| symbol.clone());

        let company_name = raw
            .long_name
            .or(raw.short_name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| canonical.clone());

        Ok(Quote {
            symbol: canonical,
            company_name,
            current_price: price,
            change: raw.change.unwrap_or(0.0),
            change_percent: raw.change_percent.unwrap_or(0.0),
            previous_close: raw.previous_close,
            market_cap: raw.market_cap,
            volume: raw.volume,
            fetched_at: self.clock.now(),
        })
    }

    pub async fn fetch_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<Vec<HistoricalPoint>, MarketDataError> {
        let symbol = normalize_symbol(symbol);
        let end = self.clock.now();
        let start = period.start_from(end);

        let points = self
            .provider
            .fetch_daily_history(&symbol, start, end)
            .await
            .map_err(|e| {
                log_provider_error("history", &symbol, &e);
                MarketDataError::HistoryUnavailable(symbol.clone())
            })?;

        if points.is_empty() {
            warn!("No historical data available for {} ({})", symbol, period.as_str());
            return Err(MarketDataError::HistoryUnavailable(symbol));
        }

        Ok(points
            .into_iter()
            .map(|p| HistoricalPoint {
                date: p.date,
                open: p.open,
                high: p.high,
                low: p.low,
                close: p.close,
                volume: p.volume,
            })
            .collect())
    }

    /// Free-text ticker search, equities only. Blank queries never reach the provider.
    pub async fn search(&self, query: &str) -> Result<Vec<TickerMatch>, MarketDataError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let matches = self.provider.search(query).await.map_err(|e| {
            log_provider_error("search", query, &e);
            MarketDataError::SearchUnavailable
        })?;

        let results: Vec<TickerMatch> = matches
            .into_iter()
            .filter(|m| m.type_display.as_deref() == Some("Equity"))
            .filter_map(|m| {
                let symbol = m.symbol.filter(|s| !s.trim().is_empty())?;
                let name = m
                    .long_name
                    .or(m.short_name)
                    .unwrap_or_else(|| symbol.clone());
                Some(TickerMatch {
                    name,
                    exchange: m.exchange.unwrap_or_else(|| "N/A".to_string()),
                    kind: "Equity".to_string(),
                    symbol,
                })
            })
            .take(MAX_SEARCH_RESULTS)
            .collect();

        info!("Search '{}' matched {} equities", query, results.len());
        Ok(results)
    }
}

fn log_provider_error(op: &str, subject: &str, e: &PriceProviderError) {
    match e {
        PriceProviderError::RateLimited => warn!("Provider rate limited {} for {}", op, subject),
        PriceProviderError::NotFound => warn!("Provider has no {} for {}", op, subject),
        _ => warn!("Provider {} failed for {}: {}", op, subject, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::price_provider::ExternalTickerMatch;
    use crate::services::clock::ManualClock;
    use crate::services::test_support::{start_time, StubProvider};
    use chrono::NaiveDate;
    use std::sync::atomic::Ordering;

    fn service(provider: Arc<StubProvider>) -> QuoteService {
        QuoteService::new(provider, Arc::new(ManualClock::new(start_time())))
    }

    #[tokio::test]
    async fn test_quote_symbol_is_uppercased_before_lookup() {
        let provider = Arc::new(StubProvider::new().with_quote("AAPL", 150.0));
        let quote = service(provider.clone()).fetch_quote(" aapl ").await.unwrap();

        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.current_price, 150.0);
        assert_eq!(quote.company_name, "AAPL Corp");
        assert_eq!(quote.fetched_at, start_time());
        assert_eq!(provider.requested_symbols(), vec!["AAPL".to_string()]);
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_quote_unavailable() {
        let provider = Arc::new(StubProvider::new().failing("TSLA"));
        let err = service(provider).fetch_quote("tsla").await.unwrap_err();
        assert_eq!(err, MarketDataError::QuoteUnavailable("TSLA".into()));
    }

    #[tokio::test]
    async fn test_zero_price_is_not_usable() {
        let provider = Arc::new(StubProvider::new().with_quote("ZERO", 0.0));
        let err = service(provider).fetch_quote("ZERO").await.unwrap_err();
        assert_eq!(err, MarketDataError::QuoteUnavailable("ZERO".into()));
    }

    #[tokio::test]
    async fn test_empty_history_is_unavailable() {
        let provider = Arc::new(StubProvider::new().with_history("NEW", vec![]));
        let err = service(provider)
            .fetch_history("new", HistoryPeriod::OneMonth)
            .await
            .unwrap_err();
        assert_eq!(err, MarketDataError::HistoryUnavailable("NEW".into()));
    }

    #[tokio::test]
    async fn test_history_is_returned_in_provider_order() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let provider = Arc::new(StubProvider::new().with_history("IBM", vec![(d1, 10.0), (d2, 12.0)]));

        let points = service(provider).fetch_history("IBM", HistoryPeriod::OneWeek).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, d1);
        assert_eq!(points[1].close, 12.0);
    }

    #[tokio::test]
    async fn test_blank_search_skips_provider() {
        let provider = Arc::new(StubProvider::new());
        let svc = service(provider.clone());

        assert!(svc.search("").await.unwrap().is_empty());
        assert!(svc.search("   ").await.unwrap().is_empty());
        assert_eq!(provider.search_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_keeps_equities_and_caps_results() {
        let mut matches: Vec<ExternalTickerMatch> = (0..15)
            .map(|i| ExternalTickerMatch {
                symbol: Some(format!("EQ{}", i)),
                long_name: None,
                short_name: if i == 0 { Some("First Equity".into()) } else { None },
                exchange: if i == 0 { Some("NMS".into()) } else { None },
                type_display: Some("Equity".into()),
            })
            .collect();
        matches.insert(
            0,
            ExternalTickerMatch {
                symbol: Some("SPY".into()),
                type_display: Some("ETF".into()),
                ..Default::default()
            },
        );
        matches.insert(
            1,
            ExternalTickerMatch {
                symbol: None,
                type_display: Some("Equity".into()),
                ..Default::default()
            },
        );

        let provider = Arc::new(StubProvider::new().with_matches(matches));
        let results = service(provider).search("eq").await.unwrap();

        assert_eq!(results.len(), 10);
        assert_eq!(results[0].symbol, "EQ0");
        assert_eq!(results[0].name, "First Equity");
        assert_eq!(results[0].exchange, "NMS");
        assert_eq!(results[1].name, "EQ1");
        assert_eq!(results[1].exchange, "N/A");
        assert!(results.iter().all(|r| r.kind == "Equity"));
    }
}
