use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::{Quote, TickerMatch};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quote/:symbol", get(get_quote))
        .route("/search", get(search))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

pub async fn get_quote(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(symbol): Path<String>,
) -> Result<Json<Quote>, AppError> {
    info!("GET /stocks/quote/{} - Getting quote", symbol);
    let quote = state.quote_cache.get_or_fetch(&symbol).await
        .map_err(|e| {
            error!("Failed to get quote for {}: {}", symbol, e);
            e
        })?;
    Ok(Json(quote))
}

pub async fn search(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<TickerMatch>>, AppError> {
    let query = params
        .query
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation("Search query required".to_string()))?;

    info!("GET /stocks/search?query={} - Searching tickers", query);
    let results = state.quotes.search(&query).await
        .map_err(|e| {
            error!("Failed to search for '{}': {}", query, e);
            e
        })?;
    Ok(Json(results))
}
