use std::sync::{Arc, Weak};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::models::Quote;
use crate::services::clock::Clock;
use crate::services::quote_service::{normalize_symbol, MarketDataError, QuoteService};

#[derive(Debug, Clone)]
struct CachedQuote {
    quote: Quote,
    fetched_at: DateTime<Utc>,
}

/// Process-wide, symbol-keyed memo in front of [`QuoteService`].
///
/// Quotes are market-wide so entries are shared across users. Concurrent misses
/// for the same symbol may both hit the provider; the last write wins.
pub struct QuoteCache {
    source: Arc<QuoteService>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: DashMap<String, CachedQuote>,
}

impl QuoteCache {
    pub fn new(source: Arc<QuoteService>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            source,
            clock,
            ttl,
            entries: DashMap::new(),
        }
    }

    pub async fn get_or_fetch(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let key = normalize_symbol(symbol);

        if let Some(quote) = self.get_fresh(&key) {
            debug!("Quote cache hit for {}", key);
            return Ok(quote);
        }

        let quote = self.source.fetch_quote(&key).await?;
        self.entries.insert(
            key,
            CachedQuote {
                quote: quote.clone(),
                fetched_at: self.clock.now(),
            },
        );
        Ok(quote)
    }

    /// Seed the cache with a quote fetched elsewhere.
    pub fn store(&self, quote: Quote) {
        self.entries.insert(
            normalize_symbol(&quote.symbol),
            CachedQuote {
                quote,
                fetched_at: self.clock.now(),
            },
        );
    }

    fn get_fresh(&self, key: &str) -> Option<Quote> {
        let entry = self.entries.get(key)?;
        if self.clock.now() - entry.fetched_at < self.ttl {
            Some(entry.quote.clone())
        } else {
            None
        }
    }

    /// Drop every entry older than the TTL. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, cached| now - cached.fetched_at < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run [`evict_expired`](Self::evict_expired) every TTL until the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self
            .ttl
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(60))
            .max(std::time::Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else { break };
                let evicted = cache.evict_expired();
                if evicted > 0 {
                    debug!("Quote cache sweep evicted {} entries", evicted);
                }
            }
        })
    }
}
