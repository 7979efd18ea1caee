//! Derived view state for the market table
//!
//! Everything here is pure: given the last fetched coin list and the
//! user's filter state, the functions compute exactly what to render.
//! Absent numeric fields count as zero, so nothing in this module fails.

use crate::{
    constants::{
        CATEGORY_CHIP_LIMIT, DEFAULT_PAGE_SIZE, HIGHLIGHT_CHANGE_PCT, HIGHLIGHT_MAX_RANK,
        MINI_LIST_LEN,
    },
    types::{Category, CoinMarketSnapshot},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Tabs of the market table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tab {
    #[default]
    All,
    /// Big movers and the top ten
    Highlights,
    /// Category chips; selecting one refetches the list
    Categories,
    /// Ecosystem category chips
    Ecosystems,
}

impl Tab {
    pub fn all() -> &'static [Tab] {
        &[Tab::All, Tab::Highlights, Tab::Categories, Tab::Ecosystems]
    }

    /// Whether this tab shows the category chip selector
    pub fn shows_categories(&self) -> bool {
        matches!(self, Tab::Categories | Tab::Ecosystems)
    }
}

/// Numeric column the table is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    Rank,
    Price,
    MarketCap,
    Change24h,
}

impl SortKey {
    /// The value compared for `coin`, zero when absent
    pub fn value(&self, coin: &CoinMarketSnapshot) -> f64 {
        match self {
            SortKey::Rank => f64::from(coin.rank()),
            SortKey::Price => coin.price(),
            SortKey::MarketCap => coin.market_cap(),
            SortKey::Change24h => coin.change_24h(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggled(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Optional table columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Price,
    Change1h,
    Change24h,
    Change7d,
    Volume,
    MarketCap,
    Sparkline,
}

/// Which optional columns are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnVisibility {
    pub price: bool,
    pub change_1h: bool,
    pub change_24h: bool,
    pub change_7d: bool,
    pub volume: bool,
    pub market_cap: bool,
    pub sparkline: bool,
}

impl ColumnVisibility {
    pub fn is_visible(&self, column: Column) -> bool {
        *self.flag(column)
    }

    pub fn toggle(&mut self, column: Column) {
        let flag = self.flag_mut(column);
        *flag = !*flag;
    }

    fn flag(&self, column: Column) -> &bool {
        match column {
            Column::Price => &self.price,
            Column::Change1h => &self.change_1h,
            Column::Change24h => &self.change_24h,
            Column::Change7d => &self.change_7d,
            Column::Volume => &self.volume,
            Column::MarketCap => &self.market_cap,
            Column::Sparkline => &self.sparkline,
        }
    }

    fn flag_mut(&mut self, column: Column) -> &mut bool {
        match column {
            Column::Price => &mut self.price,
            Column::Change1h => &mut self.change_1h,
            Column::Change24h => &mut self.change_24h,
            Column::Change7d => &mut self.change_7d,
            Column::Volume => &mut self.volume,
            Column::MarketCap => &mut self.market_cap,
            Column::Sparkline => &mut self.sparkline,
        }
    }
}

impl Default for ColumnVisibility {
    fn default() -> Self {
        Self {
            price: true,
            change_1h: true,
            change_24h: true,
            change_7d: true,
            volume: true,
            market_cap: true,
            sparkline: true,
        }
    }
}

/// Parameters of a coin-list fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoinQuery {
    pub per_page: u32,
    pub category: Option<String>,
}

impl CoinQuery {
    pub fn new(category: Option<String>) -> Self {
        Self {
            per_page: DEFAULT_PAGE_SIZE,
            category,
        }
    }
}

impl Default for CoinQuery {
    fn default() -> Self {
        Self::new(None)
    }
}

/// User-controlled filter, search and sort state of the market table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewFilterState {
    pub tab: Tab,
    /// Selected category id, only meaningful on the category tabs
    pub category: Option<String>,
    pub search: String,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub columns: ColumnVisibility,
}

impl ViewFilterState {
    /// Switches tab, resetting category and search
    ///
    /// Returns the query to refetch with, if the switch needs one. Picking
    /// the active tab again does nothing.
    pub fn select_tab(&mut self, tab: Tab) -> Option<CoinQuery> {
        if self.tab == tab {
            return None;
        }

        self.tab = tab;
        self.category = None;
        self.search.clear();

        match tab {
            Tab::All | Tab::Highlights => Some(CoinQuery::default()),
            Tab::Categories | Tab::Ecosystems => None,
        }
    }

    /// Selects a category chip; an empty id clears the selection
    pub fn select_category(&mut self, category_id: &str) -> CoinQuery {
        self.category = Some(category_id.to_string()).filter(|c| !c.is_empty());
        self.current_query()
    }

    /// Sorts by `key`, flipping to descending when `key` is already
    /// ascending and starting ascending otherwise
    pub fn toggle_sort(&mut self, key: SortKey) {
        self.sort_order = if self.sort_key == key && self.sort_order == SortOrder::Asc {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        };
        self.sort_key = key;
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    pub fn toggle_column(&mut self, column: Column) {
        self.columns.toggle(column);
    }

    /// The query matching the current category selection
    pub fn current_query(&self) -> CoinQuery {
        CoinQuery::new(self.category.clone())
    }
}

/// Whether `coin` belongs on the Highlights tab
///
/// A missing rank reads as zero, so unranked coins always qualify.
pub fn is_highlight(coin: &CoinMarketSnapshot) -> bool {
    coin.change_24h().abs() > HIGHLIGHT_CHANGE_PCT || coin.rank() <= HIGHLIGHT_MAX_RANK
}

/// Case-insensitive substring match on name or symbol, as typed
pub fn matches_search(coin: &CoinMarketSnapshot, term: &str) -> bool {
    let term = term.to_lowercase();
    if term.is_empty() {
        return true;
    }
    coin.name.to_lowercase().contains(&term) || coin.symbol.to_lowercase().contains(&term)
}

fn compare(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Stable in-place sort by `key` in `order`
pub fn sort_coins(coins: &mut [CoinMarketSnapshot], key: SortKey, order: SortOrder) {
    coins.sort_by(|a, b| {
        let ordering = compare(key.value(a), key.value(b));
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// The rows to render for `state`: tab filter, then search, then sort
pub fn filter_and_sort(
    coins: &[CoinMarketSnapshot],
    state: &ViewFilterState,
) -> Vec<CoinMarketSnapshot> {
    let mut rows: Vec<CoinMarketSnapshot> = coins
        .iter()
        .filter(|coin| state.tab != Tab::Highlights || is_highlight(coin))
        .filter(|coin| matches_search(coin, &state.search))
        .cloned()
        .collect();

    sort_coins(&mut rows, state.sort_key, state.sort_order);
    rows
}

/// The three biggest 24h movers upward, regardless of sign
pub fn trending(coins: &[CoinMarketSnapshot]) -> Vec<CoinMarketSnapshot> {
    let mut rows = coins.to_vec();
    sort_coins(&mut rows, SortKey::Change24h, SortOrder::Desc);
    rows.truncate(MINI_LIST_LEN);
    rows
}

/// Up to three coins with the largest positive 24h change
pub fn top_gainers(coins: &[CoinMarketSnapshot]) -> Vec<CoinMarketSnapshot> {
    let mut rows: Vec<CoinMarketSnapshot> = coins
        .iter()
        .filter(|c| c.change_24h() > 0.0)
        .cloned()
        .collect();
    sort_coins(&mut rows, SortKey::Change24h, SortOrder::Desc);
    rows.truncate(MINI_LIST_LEN);
    rows
}

/// Up to three coins with the largest negative 24h change
pub fn top_losers(coins: &[CoinMarketSnapshot]) -> Vec<CoinMarketSnapshot> {
    let mut rows: Vec<CoinMarketSnapshot> = coins
        .iter()
        .filter(|c| c.change_24h() < 0.0)
        .cloned()
        .collect();
    sort_coins(&mut rows, SortKey::Change24h, SortOrder::Asc);
    rows.truncate(MINI_LIST_LEN);
    rows
}

/// Category chips offered under `tab`
pub fn category_chips(categories: &[Category], tab: Tab) -> Vec<Category> {
    match tab {
        Tab::Categories => categories.iter().take(CATEGORY_CHIP_LIMIT).cloned().collect(),
        Tab::Ecosystems => categories
            .iter()
            .filter(|c| c.name.to_lowercase().contains("ecosystem"))
            .take(CATEGORY_CHIP_LIMIT)
            .cloned()
            .collect(),
        Tab::All | Tab::Highlights => Vec::new(),
    }
}
