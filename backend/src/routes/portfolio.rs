use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::{CreateTransaction, HistoryPeriod, PerformancePoint, PortfolioView, Transaction};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_portfolio))
        .route("/stocks", post(add_stock))
        .route("/stocks/:id", get(get_stock).delete(remove_stock))
        .route("/performance", get(get_performance))
}

#[derive(Debug, Deserialize)]
pub struct PerformanceQuery {
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PerformanceResponse {
    pub performance: Vec<PerformancePoint>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::Validation("Invalid transaction ID".to_string()))
}

pub async fn get_portfolio(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PortfolioView>, AppError> {
    info!("GET /portfolio - Valuing portfolio for user {}", user.user_id);
    let view = state.valuation.refresh_and_summarize(user.user_id).await
        .map_err(|e| {
            error!("Failed to value portfolio for user {}: {}", user.user_id, e);
            e
        })?;
    Ok(Json(view))
}

pub async fn add_stock(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateTransaction>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let Json(input) = payload?;
    info!("POST /portfolio/stocks - Adding {:?} for user {}", input.symbol, user.user_id);
    let transaction = state.valuation.add_lot(user.user_id, input).await
        .map_err(|e| {
            error!("Failed to add stock for user {}: {}", user.user_id, e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn get_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Transaction>, AppError> {
    info!("GET /portfolio/stocks/{} - Getting lot", id);
    let id = parse_id(&id)?;
    let transaction = state.valuation.get_lot(user.user_id, id).await?;
    Ok(Json(transaction))
}

pub async fn remove_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    info!("DELETE /portfolio/stocks/{} - Removing lot", id);
    let id = parse_id(&id)?;
    state.valuation.remove_lot(user.user_id, id).await
        .map_err(|e| {
            error!("Failed to remove lot {} for user {}: {}", id, user.user_id, e);
            e
        })?;
    Ok(Json(MessageResponse {
        message: "Stock removed successfully".to_string(),
    }))
}

pub async fn get_performance(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PerformanceQuery>,
) -> Result<Json<PerformanceResponse>, AppError> {
    let period = HistoryPeriod::parse_or_default(query.period.as_deref());
    info!("GET /portfolio/performance?period={} - user {}", period.as_str(), user.user_id);
    let performance = state.valuation.performance_series(user.user_id, period).await
        .map_err(|e| {
            error!("Failed to build performance series for user {}: {}", user.user_id, e);
            e
        })?;
    Ok(Json(PerformanceResponse { performance }))
}
