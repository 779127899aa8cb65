use crate::error::Result;
use crate::models::StockResponse;
use crate::server::AppState;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::Json;
use axum_extra::extract::Query;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tracing::{debug, instrument};

/// Query parameters for /api/stock-prices
#[derive(Debug, Deserialize, Clone)]
pub struct StockQuery {
    /// Ticker symbols (can be repeated: stock=GOOG&stock=AMZN)
    #[serde(default)]
    pub stock: Vec<String>,

    /// "true" registers a like for the caller's identity; anything else
    /// registers none
    pub like: Option<String>,
}

/// GET /api/stock-prices - Current price and likes for one or two symbols
///
/// Examples:
/// - /api/stock-prices?stock=GOOG
/// - /api/stock-prices?stock=GOOG&like=true
/// - /api/stock-prices?stock=GOOG&stock=AMZN
#[instrument(skip(app_state, headers))]
pub async fn stock_prices_handler(
    State(app_state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<StockQuery>,
) -> Result<Json<StockResponse>> {
    let identity = requester_identity(&headers, &peer);
    let wants_like = params.like.as_deref() == Some("true");
    debug!(symbols = ?params.stock, wants_like, %identity, "resolving stock prices");

    let stock_data = app_state
        .resolver
        .resolve(&params.stock, wants_like, &identity)
        .await?;

    Ok(Json(StockResponse { stock_data }))
}

/// GET /health - Liveness probe with the current equity count
pub async fn health_handler(State(app_state): State<AppState>) -> Result<Json<Value>> {
    let equities = app_state.store.equity_count().await?;
    Ok(Json(json!({
        "status": "ok",
        "equities": equities,
    })))
}

/// The string used to de-duplicate likes: the first entry of the
/// forwarded-address chain (the originating client), falling back to the
/// peer address when no proxy header is present.
fn requester_identity(headers: &HeaderMap, peer: &SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|chain| chain.split(',').next())
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}
