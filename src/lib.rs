//! # Market Dashboard SDK
//!
//! Data layer for a crypto market dashboard backed by the public CoinGecko
//! API: top coins, categories, exchanges, per-coin detail and price charts.
//!
//! Every upstream request goes through a [`FetchClient`], which serves
//! repeated requests from a 60 second session cache and backs off linearly
//! when the API answers `429 Too Many Requests`. Views over the fetched data
//! (tabs, category filter, search, sorting) are pure functions in [`view`],
//! and the stateful screens in [`dashboard`] discard responses that arrive
//! after a newer request was issued.
//!
//! ## Usage
//!
//! ```no_run
//! use market_dashboard_sdk::{MarketBoard, MarketDataApi};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = MarketDataApi::new()?;
//! let mut board = MarketBoard::new();
//!
//! // Fetch the top coins (cached for 60 seconds)
//! board.refresh(&api).await;
//!
//! for coin in board.rows() {
//!     println!("{}: ${:.2}", coin.symbol, coin.price());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The optional [`assistant`] answers price questions through a language
//! model that calls the live endpoints as tools.

pub mod assistant;
pub mod cache;
pub mod client;
pub mod constants;
pub mod dashboard;
pub mod endpoints;
pub mod error;
pub mod format;
pub mod logging;
pub mod metrics;
pub mod transport;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use cache::ResponseCache;
pub use client::{FetchClient, RetryPolicy};
pub use dashboard::{CoinDetailView, ExchangeDirectory, MarketBoard};
pub use endpoints::MarketDataApi;
pub use error::{AssistantError, FetchError, TransportError};
pub use metrics::FetchMetrics;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{
    Category, ChartPoint, ChartWindow, CoinMarketSnapshot, Exchange, MarketChartSeries,
};
pub use view::{CoinQuery, SortKey, SortOrder, Tab, ViewFilterState};
