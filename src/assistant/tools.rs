//! Tools the assistant may call to look up live market data

use crate::{
    endpoints::MarketDataApi,
    format::{format_percent, format_usd, format_usd_whole},
    types::{LiveMetrics, LivePrice},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Name of the live price tool
pub const FETCH_PRICE: &str = "fetchPrice";

/// Name of the live market metrics tool
pub const FETCH_METRICS: &str = "fetchMetrics";

/// Function declaration advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id, echoed back with the result when the backend sets one
    pub id: Option<String>,
    pub name: String,
    pub args: Value,
    /// Opaque reasoning signature that must be sent back unchanged
    pub signature: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            args,
            signature: None,
        }
    }

    /// The `coinId` argument, trimmed and lowercased
    pub fn coin_id(&self) -> Option<String> {
        self.args
            .get("coinId")
            .and_then(Value::as_str)
            .map(|id| id.trim().to_lowercase())
            .filter(|id| !id.is_empty())
    }
}

fn coin_id_schema(example: &str) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "coinId": {
                "type": "STRING",
                "description": format!("The CoinGecko ID (e.g., '{}').", example)
            }
        },
        "required": ["coinId"]
    })
}

/// The two declared tools
pub fn declarations() -> Vec<ToolDeclaration> {
    vec![
        ToolDeclaration {
            name: FETCH_PRICE.to_string(),
            description: "Get the current USD price and 24h change for a crypto asset."
                .to_string(),
            parameters: coin_id_schema("bitcoin"),
        },
        ToolDeclaration {
            name: FETCH_METRICS.to_string(),
            description: "Get detailed market metrics like market cap and volume.".to_string(),
            parameters: coin_id_schema("ethereum"),
        },
    ]
}

fn error_result(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

fn display_name(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Runs `call` against the live endpoints
///
/// Never fails: lookup problems become an `{"error": ...}` result for the
/// model to report.
pub async fn execute(api: &MarketDataApi, call: &ToolCall) -> Value {
    let Some(id) = call.coin_id() else {
        return error_result("Missing coinId argument.");
    };

    tracing::info!(tool = %call.name, coin = %id, "Running assistant tool");
    match call.name.as_str() {
        FETCH_PRICE => live_price(api, &id).await,
        FETCH_METRICS => live_metrics(api, &id).await,
        other => error_result(format!("Unknown tool '{}'.", other)),
    }
}

async fn live_price(api: &MarketDataApi, id: &str) -> Value {
    match api.live_price(id).await {
        Ok(Some(quote)) => {
            let price = LivePrice {
                coin: display_name(id),
                price_usd: format_usd(quote.usd),
                change_24h: format_percent(quote.usd_24h_change.unwrap_or(0.0)),
                timestamp: Utc::now(),
                source: "CoinGecko API (Live)".to_string(),
            };
            serde_json::to_value(price).unwrap_or_else(|e| error_result(e.to_string()))
        }
        Ok(None) => error_result(format!("Asset '{}' not found.", id)),
        Err(e) => {
            tracing::warn!(coin = %id, error = %e, "Live price lookup failed");
            error_result("Live price data unavailable. Please try again.")
        }
    }
}

async fn live_metrics(api: &MarketDataApi, id: &str) -> Value {
    match api.live_metrics(id).await {
        Ok(Some(coin)) => {
            let metrics = LiveMetrics {
                coin: coin.name.clone(),
                symbol: coin.symbol.to_uppercase(),
                price_usd: format_usd(coin.price()),
                market_cap: format_usd_whole(coin.market_cap()),
                change_24h: format_percent(coin.change_24h()),
                volume_24h: format_usd_whole(coin.volume()),
                source: "CoinGecko API (Verified)".to_string(),
            };
            serde_json::to_value(metrics).unwrap_or_else(|e| error_result(e.to_string()))
        }
        Ok(None) => error_result(format!("Metrics for '{}' unavailable.", id)),
        Err(e) => {
            tracing::warn!(coin = %id, error = %e, "Live metrics lookup failed");
            error_result("Live market data unavailable. Please try again.")
        }
    }
}
