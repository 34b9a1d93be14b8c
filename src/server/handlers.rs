use axum::{
    Json,
    extract::{OriginalUri, Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::dto::*;
use super::error::ApiError;
use super::state::AppState;
use crate::core::holding::HoldingKey;

const INVALID_STOCKS: &str = "Invalid request: stocks array is required";

/// GET / - Liveness banner
pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "OK",
        message: "Backend server is running",
        timestamp: Utc::now(),
        version: None,
    })
}

/// GET /health
pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "OK",
        message: "Portfolio API is running",
        timestamp: Utc::now(),
        version: Some(env!("CARGO_PKG_VERSION")),
    })
}

/// GET /api/portfolio/holdings - Static holdings, unenriched
pub async fn holdings(State(state): State<Arc<AppState>>) -> Json<HoldingsResponse> {
    let data = state.engine.holdings().to_vec();
    Json(HoldingsResponse {
        success: true,
        total: data.len(),
        data,
    })
}

/// GET /api/portfolio - Full valuation with sector rollups
///
/// Serves the scheduler's latest cycle. Before the first cycle completes, or
/// when no scheduler runs, a cycle is run for this request.
pub async fn portfolio(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ValuationResponse>, ApiError> {
    let data = match state.latest_valuation() {
        Some(latest) => latest.as_ref().clone(),
        None => {
            debug!("No published valuation yet, running a cycle on demand");
            state.engine.run_cycle().await
        }
    };
    Ok(Json(ValuationResponse {
        success: true,
        data,
    }))
}

/// POST /api/portfolio/prices - Batch lookup keyed by `"{symbol}_{exchange}"`
pub async fn prices(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PricesResponse>, ApiError> {
    let keys = parse_stocks(payload)?;
    info!(count = keys.len(), "Batch price request");

    let outcome = state.engine.fetcher().fetch_all(&keys).await;
    let (total, successful, failed) = (outcome.total(), outcome.successful(), outcome.failed());
    let data = outcome
        .into_keyed()
        .into_iter()
        .map(|(key, item)| (key, PriceEntry::from(item)))
        .collect();

    Ok(Json(PricesResponse {
        success: true,
        data,
        total,
        successful,
        failed,
        timestamp: Utc::now(),
    }))
}

/// GET /api/portfolio/price/{symbol}/{exchange}
pub async fn price(
    State(state): State<Arc<AppState>>,
    Path((symbol, exchange)): Path<(String, String)>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    let key = HoldingKey::new(&symbol, &exchange);
    match state.engine.fetcher().fetch_one(&key).await {
        Ok(data) => Ok(Json(SnapshotResponse {
            success: true,
            data,
        })),
        Err(e) if e.is_not_found() => Err(ApiError::NotFound {
            message: "Stock not found".into(),
            details: e.to_string(),
        }),
        Err(e) => Err(ApiError::Internal {
            message: "Failed to fetch stock price".into(),
            details: e.to_string(),
        }),
    }
}

pub async fn not_found(OriginalUri(uri): OriginalUri) -> (StatusCode, Json<NotFoundResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            success: false,
            error: "Endpoint not found",
            path: uri.path().to_string(),
        }),
    )
}

/// Accepts `{"stocks": [{"symbol", "exchange"}, ...]}` with at least one entry.
fn parse_stocks(payload: Result<Json<Value>, JsonRejection>) -> Result<Vec<HoldingKey>, ApiError> {
    let invalid = || ApiError::Validation(INVALID_STOCKS.to_string());

    let Ok(Json(body)) = payload else {
        return Err(invalid());
    };
    let stocks = body
        .get("stocks")
        .and_then(Value::as_array)
        .filter(|stocks| !stocks.is_empty())
        .ok_or_else(invalid)?;

    stocks
        .iter()
        .map(|stock| {
            serde_json::from_value::<StockRequest>(stock.clone())
                .map(|s| HoldingKey::new(&s.symbol, &s.exchange))
                .map_err(|e| ApiError::Validation(format!("Invalid request: {e}")))
        })
        .collect()
}
