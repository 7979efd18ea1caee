//! Types for the market dashboard data layer

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One row of the `/coins/markets` listing
///
/// Rows are never patched in place: a refetch replaces the whole list.
/// Numeric fields the upstream may send as `null` are optional and read
/// through accessors that fall back to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarketSnapshot {
    /// Upstream asset identifier (e.g. "bitcoin")
    pub id: String,

    /// Ticker symbol, lowercase as delivered (e.g. "btc")
    pub symbol: String,

    /// Display name
    pub name: String,

    /// Logo URL
    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub current_price: Option<f64>,

    #[serde(default)]
    pub market_cap: Option<f64>,

    /// 1-based market-cap rank
    #[serde(default)]
    pub market_cap_rank: Option<u32>,

    #[serde(default)]
    pub total_volume: Option<f64>,

    #[serde(default)]
    pub high_24h: Option<f64>,

    #[serde(default)]
    pub low_24h: Option<f64>,

    /// Absolute 24h price change in USD
    #[serde(default)]
    pub price_change_24h: Option<f64>,

    /// 24h price change in percent
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,

    #[serde(default)]
    pub price_change_percentage_1h_in_currency: Option<f64>,

    #[serde(default)]
    pub price_change_percentage_24h_in_currency: Option<f64>,

    #[serde(default)]
    pub price_change_percentage_7d_in_currency: Option<f64>,

    /// Seven days of price samples, present when `sparkline=true`
    #[serde(default)]
    pub sparkline_in_7d: Option<Sparkline>,

    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Price samples used to draw a sparkline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sparkline {
    #[serde(default)]
    pub price: Vec<f64>,
}

impl CoinMarketSnapshot {
    /// Current price in USD, zero when absent
    pub fn price(&self) -> f64 {
        self.current_price.unwrap_or(0.0)
    }

    /// Market capitalization in USD, zero when absent
    pub fn market_cap(&self) -> f64 {
        self.market_cap.unwrap_or(0.0)
    }

    /// Market-cap rank, zero when absent
    pub fn rank(&self) -> u32 {
        self.market_cap_rank.unwrap_or(0)
    }

    /// Total 24h volume in USD, zero when absent
    pub fn volume(&self) -> f64 {
        self.total_volume.unwrap_or(0.0)
    }

    /// 24h change in percent, zero when absent
    pub fn change_24h(&self) -> f64 {
        self.price_change_percentage_24h.unwrap_or(0.0)
    }

    /// 1h change in percent, zero when absent
    pub fn change_1h(&self) -> f64 {
        self.price_change_percentage_1h_in_currency.unwrap_or(0.0)
    }

    /// 7d change in percent, zero when absent
    pub fn change_7d(&self) -> f64 {
        self.price_change_percentage_7d_in_currency.unwrap_or(0.0)
    }

    /// Sparkline samples, empty when the listing was fetched without them
    pub fn sparkline(&self) -> &[f64] {
        self.sparkline_in_7d
            .as_ref()
            .map(|s| s.price.as_slice())
            .unwrap_or(&[])
    }

    /// Whether the sparkline ends above where it started
    pub fn sparkline_rising(&self) -> bool {
        match self.sparkline() {
            [first, .., last] => last > first,
            _ => false,
        }
    }

    /// Spot trading link shown as the row's buy action
    pub fn trade_url(&self) -> String {
        format!(
            "https://www.binance.com/en/trade/{}_USDT",
            self.symbol.to_uppercase()
        )
    }
}

/// One `[timestamp_ms, value]` sample of a historical series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint(pub i64, pub f64);

impl ChartPoint {
    /// Sample timestamp in milliseconds since the epoch
    pub fn timestamp_ms(&self) -> i64 {
        self.0
    }

    pub fn value(&self) -> f64 {
        self.1
    }

    /// Sample timestamp as a UTC datetime
    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }
}

/// Historical price, market-cap and volume series for one coin and window
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketChartSeries {
    #[serde(default)]
    pub prices: Vec<ChartPoint>,
    #[serde(default)]
    pub market_caps: Vec<ChartPoint>,
    #[serde(default)]
    pub total_volumes: Vec<ChartPoint>,
}

impl MarketChartSeries {
    /// Price values in time order
    pub fn price_values(&self) -> Vec<f64> {
        self.prices.iter().map(ChartPoint::value).collect()
    }

    /// Whether the last price is at or above the first
    pub fn is_rising(&self) -> bool {
        match (self.prices.first(), self.prices.last()) {
            (Some(first), Some(last)) => last.1 >= first.1,
            _ => true,
        }
    }
}

/// Day-count windows offered by the coin chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChartWindow {
    Day,
    #[default]
    Week,
    Month,
    Year,
}

impl ChartWindow {
    /// Number of days requested upstream
    pub fn days(&self) -> u32 {
        match self {
            ChartWindow::Day => 1,
            ChartWindow::Week => 7,
            ChartWindow::Month => 30,
            ChartWindow::Year => 365,
        }
    }

    /// Maps a day count back to a window
    pub fn from_days(days: u32) -> Option<Self> {
        Self::all().iter().copied().find(|w| w.days() == days)
    }

    /// Short button label
    pub fn label(&self) -> &'static str {
        match self {
            ChartWindow::Day => "24H",
            ChartWindow::Week => "7D",
            ChartWindow::Month => "30D",
            ChartWindow::Year => "1Y",
        }
    }

    /// Axis label for a sample: time of day for the 1-day window, date otherwise
    pub fn label_for(&self, point: &ChartPoint) -> String {
        let Some(time) = point.time() else {
            return String::new();
        };
        match self {
            ChartWindow::Day => time.format("%H:%M").to_string(),
            _ => time.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn all() -> &'static [ChartWindow] {
        &[
            ChartWindow::Day,
            ChartWindow::Week,
            ChartWindow::Month,
            ChartWindow::Year,
        ]
    }
}

/// Entry of the category reference list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: String,
    pub name: String,
}

/// Row of the exchange directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub year_established: Option<u32>,
    /// Provider-assigned quality score out of 10
    #[serde(default)]
    pub trust_score: Option<u32>,
    #[serde(default)]
    pub trust_score_rank: Option<u32>,
    #[serde(default)]
    pub trade_volume_24h_btc: Option<f64>,
}

impl Exchange {
    /// 24h volume in BTC rounded to a whole coin
    pub fn volume_btc_rounded(&self) -> u64 {
        self.trade_volume_24h_btc.unwrap_or(0.0).round().max(0.0) as u64
    }
}

/// Quote from `/simple/price` for one coin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimplePrice {
    pub usd: f64,
    #[serde(default)]
    pub usd_24h_change: Option<f64>,
}

/// Result of the assistant's live price tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePrice {
    pub coin: String,
    pub price_usd: String,
    pub change_24h: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

/// Result of the assistant's live market metrics tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveMetrics {
    pub coin: String,
    pub symbol: String,
    pub price_usd: String,
    pub market_cap: String,
    pub change_24h: String,
    pub volume_24h: String,
    pub source: String,
}
