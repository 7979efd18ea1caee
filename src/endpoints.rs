//! Market data endpoints
//!
//! Each accessor describes one upstream resource: it builds the fully
//! qualified request URL from its parameters (which makes caching
//! parameter-sensitive) and names the shape it expects back. Retry,
//! caching and error classification live in [`FetchClient`].

use crate::{
    client::FetchClient,
    constants::{API_URL_ENV, COINGECKO_API_URL, VS_CURRENCY},
    error::FetchError,
    types::{Category, ChartWindow, CoinMarketSnapshot, Exchange, MarketChartSeries, SimplePrice},
};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;

/// Percent-change windows requested with every market listing
const CHANGE_WINDOWS: &str = "1h,24h,7d";

/// Typed accessors for the CoinGecko REST API
#[derive(Clone)]
pub struct MarketDataApi {
    client: Arc<FetchClient>,
    base_url: Url,
}

impl MarketDataApi {
    /// Creates an API over reqwest with a fresh session cache
    ///
    /// The upstream base URL can be overridden with
    /// `MARKET_DASHBOARD_API_URL`.
    pub fn new() -> Result<Self, FetchError> {
        let client = FetchClient::new().map_err(|e| FetchError::config(e.to_string()))?;
        Self::from_env(Arc::new(client))
    }

    /// Creates an API over `client`, honouring the base URL override
    pub fn from_env(client: Arc<FetchClient>) -> Result<Self, FetchError> {
        let base_url =
            std::env::var(API_URL_ENV).unwrap_or_else(|_| COINGECKO_API_URL.to_string());
        Self::with_base_url(client, &base_url)
    }

    /// Creates an API over `client` against an explicit base URL
    pub fn with_base_url(client: Arc<FetchClient>, base_url: &str) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FetchError::config(format!("invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::config(format!(
                "base URL {} cannot carry a path",
                base_url
            )));
        }

        Ok(Self { client, base_url })
    }

    /// The fetch client every endpoint goes through
    pub fn client(&self) -> &Arc<FetchClient> {
        &self.client
    }

    /// Joins path segments and query pairs onto the base URL
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url.to_string()
    }

    /// URL of the top-coins listing, optionally narrowed to a category
    pub fn top_coins_url(&self, per_page: u32, category: Option<&str>) -> String {
        let per_page = per_page.to_string();
        let mut query = vec![
            ("vs_currency", VS_CURRENCY),
            ("order", "market_cap_desc"),
            ("per_page", per_page.as_str()),
            ("page", "1"),
            ("sparkline", "true"),
            ("price_change_percentage", CHANGE_WINDOWS),
        ];
        if let Some(category) = category.filter(|c| !c.is_empty()) {
            query.push(("category", category));
        }
        self.endpoint(&["coins", "markets"], &query)
    }

    pub fn categories_url(&self) -> String {
        self.endpoint(&["coins", "categories", "list"], &[])
    }

    pub fn exchanges_url(&self, per_page: u32) -> String {
        let per_page = per_page.to_string();
        self.endpoint(&["exchanges"], &[("per_page", per_page.as_str()), ("page", "1")])
    }

    pub fn coin_details_url(&self, id: &str) -> String {
        self.endpoint(
            &["coins", "markets"],
            &[
                ("vs_currency", VS_CURRENCY),
                ("ids", id),
                ("sparkline", "true"),
                ("price_change_percentage", CHANGE_WINDOWS),
            ],
        )
    }

    pub fn market_chart_url(&self, id: &str, window: ChartWindow) -> String {
        let days = window.days().to_string();
        self.endpoint(
            &["coins", id, "market_chart"],
            &[("vs_currency", VS_CURRENCY), ("days", days.as_str())],
        )
    }

    pub fn live_price_url(&self, id: &str) -> String {
        self.endpoint(
            &["simple", "price"],
            &[
                ("ids", id),
                ("vs_currencies", VS_CURRENCY),
                ("include_24hr_change", "true"),
            ],
        )
    }

    pub fn live_metrics_url(&self, id: &str) -> String {
        self.endpoint(
            &["coins", "markets"],
            &[("vs_currency", VS_CURRENCY), ("ids", id)],
        )
    }

    /// Top coins by market cap, with sparklines and 1h/24h/7d changes
    pub async fn top_coins(
        &self,
        per_page: u32,
        category: Option<&str>,
    ) -> Result<Vec<CoinMarketSnapshot>, FetchError> {
        self.client
            .fetch_with_retry(&self.top_coins_url(per_page, category))
            .await
    }

    /// The category reference list
    pub async fn categories(&self) -> Result<Vec<Category>, FetchError> {
        self.client.fetch_with_retry(&self.categories_url()).await
    }

    /// Exchanges ranked by trust score
    pub async fn exchanges(&self, per_page: u32) -> Result<Vec<Exchange>, FetchError> {
        self.client
            .fetch_with_retry(&self.exchanges_url(per_page))
            .await
    }

    /// Market row for a single coin, `None` if the id is unknown
    pub async fn coin_details(&self, id: &str) -> Result<Option<CoinMarketSnapshot>, FetchError> {
        let rows: Vec<CoinMarketSnapshot> = self
            .client
            .fetch_with_retry(&self.coin_details_url(id))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Historical price, market-cap and volume series
    pub async fn market_chart(
        &self,
        id: &str,
        window: ChartWindow,
    ) -> Result<MarketChartSeries, FetchError> {
        self.client
            .fetch_with_retry(&self.market_chart_url(id, window))
            .await
    }

    /// Coin row and chart fetched concurrently; fails if either fails
    pub async fn coin_with_chart(
        &self,
        id: &str,
        window: ChartWindow,
    ) -> Result<(Option<CoinMarketSnapshot>, MarketChartSeries), FetchError> {
        futures::try_join!(self.coin_details(id), self.market_chart(id, window))
    }

    /// Live quote for one coin, bypassing the cache
    pub async fn live_price(&self, id: &str) -> Result<Option<SimplePrice>, FetchError> {
        let mut quotes: HashMap<String, SimplePrice> =
            self.client.fetch_uncached(&self.live_price_url(id)).await?;
        Ok(quotes.remove(id))
    }

    /// Live market row for one coin, bypassing the cache
    pub async fn live_metrics(&self, id: &str) -> Result<Option<CoinMarketSnapshot>, FetchError> {
        let rows: Vec<CoinMarketSnapshot> =
            self.client.fetch_uncached(&self.live_metrics_url(id)).await?;
        Ok(rows.into_iter().next())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache::ResponseCache, transport::mock::MockTransport};
    use serde_json::json;
    use std::time::Duration;

    const BASE: &str = "https://api.test/api/v3";

    fn api(transport: &MockTransport) -> MarketDataApi {
        let client = FetchClient::with_transport(
            Arc::new(transport.clone()),
            Arc::new(ResponseCache::new()),
        );
        MarketDataApi::with_base_url(Arc::new(client), BASE).unwrap()
    }

    #[test]
    fn test_urls_carry_every_parameter() {
        let api = api(&MockTransport::new());

        assert_eq!(
            api.top_coins_url(50, None),
            "https://api.test/api/v3/coins/markets?vs_currency=usd&order=market_cap_desc&per_page=50&page=1&sparkline=true&price_change_percentage=1h%2C24h%2C7d"
        );
        assert_eq!(
            api.categories_url(),
            "https://api.test/api/v3/coins/categories/list"
        );
        assert_eq!(
            api.exchanges_url(25),
            "https://api.test/api/v3/exchanges?per_page=25&page=1"
        );
        assert_eq!(
            api.market_chart_url("bitcoin", ChartWindow::Month),
            "https://api.test/api/v3/coins/bitcoin/market_chart?vs_currency=usd&days=30"
        );
        assert!(api.coin_details_url("bitcoin").contains("ids=bitcoin"));
        assert!(api
            .live_price_url("ethereum")
            .ends_with("/simple/price?ids=ethereum&vs_currencies=usd&include_24hr_change=true"));
    }

    #[test]
    fn test_category_changes_the_key() {
        let api = api(&MockTransport::new());

        let defi = api.top_coins_url(50, Some("defi"));
        let nft = api.top_coins_url(50, Some("nft"));
        assert_ne!(defi, nft);
        assert!(defi.ends_with("&category=defi"));
        assert_eq!(api.top_coins_url(50, Some("")), api.top_coins_url(50, None));
        assert_ne!(api.top_coins_url(50, None), api.top_coins_url(100, None));
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        let client = Arc::new(FetchClient::with_transport(
            Arc::new(MockTransport::new()),
            Arc::new(ResponseCache::new()),
        ));
        assert!(matches!(
            MarketDataApi::with_base_url(client.clone(), "not a url"),
            Err(FetchError::Config(_))
        ));
        assert!(matches!(
            MarketDataApi::with_base_url(client, "mailto:someone@example.com"),
            Err(FetchError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_categories_never_share_a_cache_entry() {
        let transport = MockTransport::new();
        transport
            .push_json(json!([fixtures::coin("uniswap", "uni", "Uniswap", 20, 1.0)]))
            .push_json(json!([fixtures::coin("apecoin", "ape", "ApeCoin", 60, 4.0)]));
        let api = api(&transport);

        let defi = api.top_coins(50, Some("defi")).await.unwrap();
        let nft = api.top_coins(50, Some("nft")).await.unwrap();

        assert_eq!(defi[0].id, "uniswap");
        assert_eq!(nft[0].id, "apecoin");
        assert_eq!(transport.call_count(), 2);
        assert_eq!(api.client().cache().len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_top_coins_cached_for_sixty_seconds() {
        let transport = MockTransport::new();
        transport.set_fallback_json(json!([fixtures::coin("bitcoin", "btc", "Bitcoin", 1, 2.0)]));
        let api = api(&transport);

        let first = api.top_coins(50, None).await.unwrap();
        assert_eq!(transport.call_count(), 1);

        let second = api.top_coins(50, None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(transport.call_count(), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        api.top_coins(50, None).await.unwrap();
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_coin_with_chart_joins_both() {
        let transport = MockTransport::new();
        transport
            .route("/coins/markets", json!([fixtures::coin("bitcoin", "btc", "Bitcoin", 1, 2.0)]))
            .route("/market_chart", fixtures::chart());
        let api = api(&transport);

        let (coin, chart) = api
            .coin_with_chart("bitcoin", ChartWindow::Week)
            .await
            .unwrap();

        assert_eq!(coin.map(|c| c.id), Some("bitcoin".to_string()));
        assert_eq!(chart.prices.len(), 2);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_coin_with_chart_fails_as_a_whole() {
        let transport = MockTransport::new();
        transport
            .route("/coins/markets", json!([fixtures::coin("bitcoin", "btc", "Bitcoin", 1, 2.0)]))
            .route_status("/market_chart", 404);
        let api = api(&transport);

        let err = api
            .coin_with_chart("bitcoin", ChartWindow::Week)
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::server(404, "Not Found"));
    }

    #[tokio::test]
    async fn test_unknown_coin_is_none() {
        let transport = MockTransport::new();
        transport.push_json(json!([]));
        let api = api(&transport);

        assert_eq!(api.coin_details("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_live_price_is_uncached() {
        let transport = MockTransport::new();
        transport
            .push_json(json!({ "bitcoin": { "usd": 64000.0, "usd_24h_change": 1.5 } }))
            .push_json(json!({}));
        let api = api(&transport);

        let quote = api.live_price("bitcoin").await.unwrap().unwrap();
        assert_eq!(quote.usd, 64000.0);
        assert_eq!(quote.usd_24h_change, Some(1.5));

        assert_eq!(api.live_price("bitcoin").await.unwrap(), None);
        assert_eq!(transport.call_count(), 2);
        assert!(api.client().cache().is_empty().await);
    }
}
