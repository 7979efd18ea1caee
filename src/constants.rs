//! Constants for the market dashboard data layer
//!
//! Fixed tuning values live here. The only runtime configuration is the
//! assistant API credential and an optional upstream URL override, both
//! read from the environment.

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Environment variable that overrides the upstream base URL
pub const API_URL_ENV: &str = "MARKET_DASHBOARD_API_URL";

/// How long a cached response stays fresh (in seconds)
pub const CACHE_TTL_SECS: u64 = 60;

/// Maximum number of network attempts per request
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for the linear retry backoff (in milliseconds)
pub const RETRY_BASE_DELAY_MS: u64 = 2000;

/// HTTP request timeout (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "market-dashboard-sdk/0.1.0";

/// Default number of rows requested for coin and exchange listings
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Quote currency for every market query
pub const VS_CURRENCY: &str = "usd";

/// Absolute 24h change (percent) above which a coin is a highlight
pub const HIGHLIGHT_CHANGE_PCT: f64 = 2.5;

/// Market-cap rank at or below which a coin is always a highlight
pub const HIGHLIGHT_MAX_RANK: u32 = 10;

/// Number of coins in the trending / gainers / losers panels
pub const MINI_LIST_LEN: usize = 3;

/// Maximum number of category chips shown under the tab bar
pub const CATEGORY_CHIP_LIMIT: usize = 40;

/// Gemini REST API base URL
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used by the assistant
pub const ASSISTANT_MODEL: &str = "gemini-3-flash-preview";

/// Sampling temperature for the assistant
pub const ASSISTANT_TEMPERATURE: f32 = 0.1;

/// Deadline for a single assistant model turn (in seconds)
pub const ASSISTANT_TIMEOUT_SECS: u64 = 30;

/// Environment variables holding the assistant API key, in lookup order
pub const ASSISTANT_KEY_ENV: &[&str] = &["GEMINI_API_KEY", "API_KEY"];
