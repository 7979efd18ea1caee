//! Dashboard view models
//!
//! Each view model owns the last successfully fetched data for one page
//! and applies fetch outcomes under two rules:
//!
//! - only the response to the most recently issued request is applied;
//!   a slower response to superseded parameters is discarded
//! - a failure records the error but keeps the previously loaded data
//!
//! Fetching is split into `begin_*` (issue a ticket) and `complete_*`
//! (apply an outcome) so callers can run requests concurrently; the
//! async convenience methods do both in sequence.

use crate::{
    constants::DEFAULT_PAGE_SIZE,
    endpoints::MarketDataApi,
    error::FetchError,
    types::{Category, ChartWindow, CoinMarketSnapshot, Exchange, MarketChartSeries},
    view::{self, CoinQuery, Column, SortKey, Tab, ViewFilterState},
};

/// Handle for one issued request and the parameters it was issued with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<P> {
    id: u64,
    params: P,
}

impl<P> Ticket<P> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn params(&self) -> &P {
        &self.params
    }
}

/// Issues tickets and remembers which one is current
#[derive(Debug, Clone)]
pub struct RequestTracker<P> {
    next_id: u64,
    current: Option<Ticket<P>>,
}

impl<P: Clone + PartialEq> RequestTracker<P> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            current: None,
        }
    }

    /// Issues a ticket for `params`, superseding any outstanding one
    pub fn issue(&mut self, params: P) -> Ticket<P> {
        self.next_id += 1;
        let ticket = Ticket {
            id: self.next_id,
            params,
        };
        self.current = Some(ticket.clone());
        ticket
    }

    /// True if `ticket` is the latest one issued
    pub fn accepts(&self, ticket: &Ticket<P>) -> bool {
        self.current.as_ref() == Some(ticket)
    }

    /// Parameters of the latest ticket
    pub fn current_params(&self) -> Option<&P> {
        self.current.as_ref().map(|t| &t.params)
    }
}

impl<P: Clone + PartialEq> Default for RequestTracker<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Home page: the market table with its tabs, chips and mini lists
#[derive(Debug, Default)]
pub struct MarketBoard {
    coins: Vec<CoinMarketSnapshot>,
    categories: Vec<Category>,
    filter: ViewFilterState,
    loading: bool,
    error: Option<FetchError>,
    requests: RequestTracker<CoinQuery>,
}

impl MarketBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a coin-list fetch for `query` as in flight
    pub fn begin_load(&mut self, query: CoinQuery) -> Ticket<CoinQuery> {
        self.loading = true;
        self.error = None;
        self.requests.issue(query)
    }

    /// Applies a coin-list outcome; returns false if the ticket was stale
    pub fn complete_load(
        &mut self,
        ticket: &Ticket<CoinQuery>,
        outcome: Result<Vec<CoinMarketSnapshot>, FetchError>,
    ) -> bool {
        if !self.requests.accepts(ticket) {
            tracing::debug!(ticket = ticket.id(), "Discarding superseded coin list response");
            return false;
        }

        self.loading = false;
        match outcome {
            Ok(coins) => {
                tracing::debug!(count = coins.len(), category = ?ticket.params().category, "Coin list loaded");
                self.coins = coins;
                self.error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Coin list fetch failed");
                self.error = Some(e);
            }
        }
        true
    }

    /// Fetches the coin list for `query` and applies it
    pub async fn load(&mut self, api: &MarketDataApi, query: CoinQuery) -> bool {
        let ticket = self.begin_load(query);
        let outcome = api
            .top_coins(ticket.params().per_page, ticket.params().category.as_deref())
            .await;
        self.complete_load(&ticket, outcome)
    }

    /// Fetches the coin list for the current filter state
    pub async fn refresh(&mut self, api: &MarketDataApi) -> bool {
        let query = self.filter.current_query();
        self.load(api, query).await
    }

    /// Explicit retry after a failure, with the same category as before
    pub async fn retry(&mut self, api: &MarketDataApi) -> bool {
        let query = self
            .requests
            .current_params()
            .cloned()
            .unwrap_or_else(|| self.filter.current_query());
        self.load(api, query).await
    }

    /// Loads the category reference list; failures leave it empty
    pub async fn load_categories(&mut self, api: &MarketDataApi) {
        match api.categories().await {
            Ok(categories) => self.categories = categories,
            Err(e) => tracing::warn!(error = %e, "Category list fetch failed"),
        }
    }

    /// Switches tab, refetching when the tab needs the unfiltered list
    pub async fn select_tab(&mut self, api: &MarketDataApi, tab: Tab) {
        if let Some(query) = self.filter.select_tab(tab) {
            self.load(api, query).await;
        }
    }

    /// Selects a category chip and refetches the list for it
    pub async fn select_category(&mut self, api: &MarketDataApi, category_id: &str) {
        let query = self.filter.select_category(category_id);
        self.load(api, query).await;
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.filter.set_search(term);
    }

    pub fn toggle_sort(&mut self, key: SortKey) {
        self.filter.toggle_sort(key);
    }

    pub fn toggle_column(&mut self, column: Column) {
        self.filter.toggle_column(column);
    }

    /// Rows to render, recomputed from the current inputs
    pub fn rows(&self) -> Vec<CoinMarketSnapshot> {
        view::filter_and_sort(&self.coins, &self.filter)
    }

    pub fn trending(&self) -> Vec<CoinMarketSnapshot> {
        view::trending(&self.coins)
    }

    pub fn top_gainers(&self) -> Vec<CoinMarketSnapshot> {
        view::top_gainers(&self.coins)
    }

    pub fn top_losers(&self) -> Vec<CoinMarketSnapshot> {
        view::top_losers(&self.coins)
    }

    pub fn category_chips(&self) -> Vec<Category> {
        view::category_chips(&self.categories, self.filter.tab)
    }

    pub fn coins(&self) -> &[CoinMarketSnapshot] {
        &self.coins
    }

    pub fn filter(&self) -> &ViewFilterState {
        &self.filter
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True while the first load is still pending (skeleton rows)
    pub fn shows_placeholder(&self) -> bool {
        self.loading && self.coins.is_empty()
    }
}

/// Parameters of a coin detail fetch
pub type DetailParams = (String, ChartWindow);

/// Coin page: one coin's market row plus its price chart
#[derive(Debug)]
pub struct CoinDetailView {
    coin_id: String,
    window: ChartWindow,
    coin: Option<CoinMarketSnapshot>,
    chart: Option<MarketChartSeries>,
    loading: bool,
    error: Option<FetchError>,
    requests: RequestTracker<DetailParams>,
}

impl CoinDetailView {
    pub fn new(coin_id: impl Into<String>) -> Self {
        Self {
            coin_id: coin_id.into(),
            window: ChartWindow::default(),
            coin: None,
            chart: None,
            loading: false,
            error: None,
            requests: RequestTracker::new(),
        }
    }

    pub fn begin(&mut self) -> Ticket<DetailParams> {
        self.loading = true;
        self.error = None;
        self.requests.issue((self.coin_id.clone(), self.window))
    }

    /// Applies a joined coin + chart outcome; returns false if stale
    pub fn complete(
        &mut self,
        ticket: &Ticket<DetailParams>,
        outcome: Result<(Option<CoinMarketSnapshot>, MarketChartSeries), FetchError>,
    ) -> bool {
        if !self.requests.accepts(ticket) {
            tracing::debug!(
                coin = %ticket.params().0,
                days = ticket.params().1.days(),
                "Discarding superseded chart response"
            );
            return false;
        }

        self.loading = false;
        match outcome {
            Ok((coin, chart)) => {
                self.coin = coin;
                self.chart = Some(chart);
                self.error = None;
            }
            Err(e) => {
                tracing::warn!(coin = %self.coin_id, error = %e, "Coin detail fetch failed");
                self.error = Some(e);
            }
        }
        true
    }

    /// Fetches the coin and the chart for the current window
    pub async fn load(&mut self, api: &MarketDataApi) -> bool {
        let ticket = self.begin();
        let (id, window) = ticket.params().clone();
        let outcome = api.coin_with_chart(&id, window).await;
        self.complete(&ticket, outcome)
    }

    /// Changes the chart window; the caller should follow with `load`
    /// (or `begin`/`complete`)
    pub fn set_window(&mut self, window: ChartWindow) {
        self.window = window;
    }

    pub fn coin_id(&self) -> &str {
        &self.coin_id
    }

    pub fn window(&self) -> ChartWindow {
        self.window
    }

    pub fn coin(&self) -> Option<&CoinMarketSnapshot> {
        self.coin.as_ref()
    }

    pub fn chart(&self) -> Option<&MarketChartSeries> {
        self.chart.as_ref()
    }

    /// Axis labels for the loaded chart
    pub fn chart_labels(&self) -> Vec<String> {
        self.chart
            .as_ref()
            .map(|chart| {
                chart
                    .prices
                    .iter()
                    .map(|p| self.window.label_for(p))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True once a load completed without finding the coin
    pub fn is_not_found(&self) -> bool {
        !self.loading && self.error.is_none() && self.chart.is_some() && self.coin.is_none()
    }
}

/// Exchange directory page
#[derive(Debug, Default)]
pub struct ExchangeDirectory {
    exchanges: Vec<Exchange>,
    loading: bool,
    error: Option<FetchError>,
}

impl ExchangeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the top exchanges; a failure keeps the previous rows
    pub async fn load(&mut self, api: &MarketDataApi) {
        self.loading = true;
        match api.exchanges(DEFAULT_PAGE_SIZE).await {
            Ok(exchanges) => {
                self.exchanges = exchanges;
                self.error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Exchange list fetch failed");
                self.error = Some(e);
            }
        }
        self.loading = false;
    }

    pub fn rows(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::ResponseCache, client::FetchClient, endpoints::fixtures,
        transport::mock::MockTransport,
    };
    use serde_json::json;
    use std::sync::Arc;

    const BASE: &str = "https://api.test/api/v3";

    fn api(transport: &MockTransport) -> MarketDataApi {
        let client = FetchClient::with_transport(
            Arc::new(transport.clone()),
            Arc::new(ResponseCache::new()),
        );
        MarketDataApi::with_base_url(Arc::new(client), BASE).unwrap()
    }

    fn coin(id: &str, rank: u32, change: f64) -> CoinMarketSnapshot {
        serde_json::from_value(fixtures::coin(id, id, id, rank, change)).unwrap()
    }

    #[test]
    fn test_tracker_accepts_only_latest() {
        let mut tracker = RequestTracker::new();
        let first = tracker.issue("7d");
        let second = tracker.issue("30d");

        assert!(!tracker.accepts(&first));
        assert!(tracker.accepts(&second));
        assert_eq!(tracker.current_params(), Some(&"30d"));

        let again = tracker.issue("7d");
        assert!(!tracker.accepts(&first));
        assert!(tracker.accepts(&again));
    }

    #[test]
    fn test_board_discards_superseded_response() {
        let mut board = MarketBoard::new();
        let defi = board.begin_load(CoinQuery::new(Some("defi".to_string())));
        let nft = board.begin_load(CoinQuery::new(Some("nft".to_string())));

        assert!(board.complete_load(&nft, Ok(vec![coin("ape", 60, 1.0)])));
        assert!(!board.complete_load(&defi, Ok(vec![coin("uni", 20, 1.0)])));

        assert_eq!(board.coins()[0].id, "ape");
        assert!(!board.is_loading());
    }

    #[test]
    fn test_board_failure_keeps_previous_coins() {
        let mut board = MarketBoard::new();
        let first = board.begin_load(CoinQuery::default());
        board.complete_load(&first, Ok(vec![coin("bitcoin", 1, 1.0)]));

        let second = board.begin_load(CoinQuery::default());
        assert!(board.complete_load(&second, Err(FetchError::rate_limited())));

        assert_eq!(board.coins().len(), 1);
        assert!(board.error().is_some_and(FetchError::is_rate_limited));
    }

    #[test]
    fn test_board_replaces_list_wholesale() {
        let mut board = MarketBoard::new();
        let first = board.begin_load(CoinQuery::default());
        board.complete_load(&first, Ok(vec![coin("a", 1, 1.0), coin("b", 2, 1.0)]));

        let second = board.begin_load(CoinQuery::default());
        board.complete_load(&second, Ok(vec![coin("c", 3, 1.0)]));

        let ids: Vec<&str> = board.coins().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_board_retry_reuses_category() {
        let transport = MockTransport::new();
        transport
            .push_status(500)
            .push_json(json!([fixtures::coin("uniswap", "uni", "Uniswap", 20, 3.0)]));
        let api = api(&transport);
        let mut board = MarketBoard::new();

        board.select_tab(&api, Tab::Categories).await;
        assert_eq!(transport.call_count(), 0);

        board.select_category(&api, "defi").await;
        assert_eq!(board.error(), Some(&FetchError::server(500, "Internal Server Error")));

        board.retry(&api).await;
        assert!(board.error().is_none());
        assert_eq!(board.rows()[0].id, "uniswap");

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|url| url.ends_with("&category=defi")));
    }

    #[tokio::test]
    async fn test_board_views() {
        let transport = MockTransport::new();
        transport
            .route(
                "/coins/markets",
                json!([
                    fixtures::coin("bitcoin", "btc", "Bitcoin", 1, 1.0),
                    fixtures::coin("pepe", "pepe", "Pepe", 40, 9.0),
                    fixtures::coin("ethereum", "eth", "Ethereum", 2, -2.0)
                ]),
            )
            .route(
                "/categories/list",
                json!([
                    { "category_id": "solana-ecosystem", "name": "Solana Ecosystem" },
                    { "category_id": "meme-token", "name": "Meme" }
                ]),
            );
        let api = api(&transport);
        let mut board = MarketBoard::new();

        board.refresh(&api).await;
        board.load_categories(&api).await;

        board.toggle_sort(SortKey::Change24h);
        let rows: Vec<String> = board.rows().into_iter().map(|c| c.id).collect();
        assert_eq!(rows, vec!["ethereum", "bitcoin", "pepe"]);

        board.set_search("eth");
        assert_eq!(board.rows().len(), 1);

        assert_eq!(board.trending()[0].id, "pepe");
        assert_eq!(board.top_losers()[0].id, "ethereum");
        assert_eq!(board.top_gainers().len(), 2);

        assert!(board.category_chips().is_empty());
        board.select_tab(&api, Tab::Ecosystems).await;
        assert_eq!(board.category_chips().len(), 1);
        assert!(board.filter().search.is_empty());
    }

    #[test]
    fn test_detail_window_change_discards_old_chart() {
        let mut detail = CoinDetailView::new("bitcoin");
        let week = detail.begin();
        detail.set_window(ChartWindow::Year);
        let year = detail.begin();

        let year_chart: MarketChartSeries = serde_json::from_value(fixtures::chart()).unwrap();
        assert!(detail.complete(&year, Ok((Some(coin("bitcoin", 1, 1.0)), year_chart.clone()))));
        assert!(!detail.complete(&week, Ok((None, MarketChartSeries::default()))));

        assert_eq!(detail.chart(), Some(&year_chart));
        assert_eq!(detail.window(), ChartWindow::Year);
        assert_eq!(detail.chart_labels(), vec!["2024-03-01", "2024-03-02"]);
    }

    #[tokio::test]
    async fn test_detail_load_and_not_found() {
        let transport = MockTransport::new();
        transport
            .route("/coins/markets", json!([]))
            .route("/market_chart", fixtures::chart());
        let api = api(&transport);

        let mut detail = CoinDetailView::new("nope");
        assert!(detail.load(&api).await);
        assert!(detail.is_not_found());
    }

    #[tokio::test]
    async fn test_detail_failure_keeps_previous_data() {
        let transport = MockTransport::new();
        transport
            .route("/coins/markets", json!([fixtures::coin("bitcoin", "btc", "Bitcoin", 1, 1.0)]))
            .route("days=7", fixtures::chart())
            .route_status("days=30", 404);
        let api = api(&transport);

        let mut detail = CoinDetailView::new("bitcoin");
        detail.load(&api).await;
        assert!(detail.coin().is_some());

        detail.set_window(ChartWindow::Month);
        detail.load(&api).await;
        assert_eq!(detail.error(), Some(&FetchError::server(404, "Not Found")));
        assert!(detail.chart().is_some());
        assert_eq!(detail.coin().map(|c| c.id.as_str()), Some("bitcoin"));
    }

    #[tokio::test]
    async fn test_exchange_directory() {
        let transport = MockTransport::new();
        transport.push_json(json!([{
            "id": "binance",
            "name": "Binance",
            "image": "https://img.test/binance.png",
            "url": "https://www.binance.com/",
            "year_established": 2017,
            "trust_score": 10,
            "trust_score_rank": 1,
            "trade_volume_24h_btc": 250000.6
        }]));
        let api = api(&transport);

        let mut directory = ExchangeDirectory::new();
        directory.load(&api).await;

        assert_eq!(directory.rows().len(), 1);
        assert_eq!(directory.rows()[0].trust_score, Some(10));
        assert_eq!(directory.rows()[0].volume_btc_rounded(), 250001);
        assert!(transport.requests()[0].ends_with("/exchanges?per_page=50&page=1"));
    }
}
