use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use stockfolio_backend::app;
use stockfolio_backend::auth::TokenVerifier;
use stockfolio_backend::config::AppConfig;
use stockfolio_backend::db::PgLedgerStore;
use stockfolio_backend::external::yahoo::YahooFinanceProvider;
use stockfolio_backend::logging::{init_logging, LoggingConfig};
use stockfolio_backend::services::clock::SystemClock;
use stockfolio_backend::services::quote_cache::QuoteCache;
use stockfolio_backend::services::quote_service::QuoteService;
use stockfolio_backend::services::valuation_service::ValuationService;
use stockfolio_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())?;

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(30))
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;
    tracing::info!("✅ PostgreSQL connected and migrated");

    let clock = Arc::new(SystemClock);
    let provider = Arc::new(
        YahooFinanceProvider::new(config.provider_timeout)
            .context("failed to build Yahoo Finance client")?,
    );
    let quotes = Arc::new(QuoteService::new(provider, clock.clone()));

    let ttl = chrono::Duration::from_std(config.quote_cache_ttl)
        .context("QUOTE_CACHE_TTL_SECS out of range")?;
    let quote_cache = Arc::new(QuoteCache::new(quotes.clone(), clock.clone(), ttl));
    let sweeper = quote_cache.spawn_sweeper();

    let valuation = Arc::new(ValuationService::new(
        Arc::new(PgLedgerStore::new(pool)),
        quotes.clone(),
        quote_cache.clone(),
        clock,
        config.valuation_concurrency,
    ));

    let state = AppState {
        valuation,
        quotes,
        quote_cache,
        tokens: Arc::new(TokenVerifier::new(&config.jwt_secret)),
    };
    let app = app::create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Stockfolio backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    sweeper.abort();
    Ok(())
}
