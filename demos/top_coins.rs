use market_dashboard_sdk::format::{format_compact, format_percent, format_usd};
use market_dashboard_sdk::{logging, MarketBoard, MarketDataApi, SortKey};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let api = MarketDataApi::new()?;
    let mut board = MarketBoard::new();

    println!("Market Dashboard (source: CoinGecko)");
    println!("-------------------------------------------");

    // 1. Cold fetch goes to the network
    let start = Instant::now();
    board.refresh(&api).await;
    if let Some(e) = board.error() {
        eprintln!("Error: could not load markets: {}", e);
        return Ok(());
    }
    println!("Loaded {} coins in {:?}", board.coins().len(), start.elapsed());

    // 2. Second fetch within the freshness window is served from cache
    let start = Instant::now();
    board.refresh(&api).await;
    println!("Cached refresh took {:?}", start.elapsed());
    println!();

    println!("Trending:");
    for coin in board.trending() {
        println!("  {:<8} {}", coin.symbol.to_uppercase(), format_usd(coin.price()));
    }
    println!("Top gainers:");
    for coin in board.top_gainers() {
        println!("  {:<8} {}", coin.symbol.to_uppercase(), format_percent(coin.change_24h()));
    }
    println!("Top losers:");
    for coin in board.top_losers() {
        println!("  {:<8} {}", coin.symbol.to_uppercase(), format_percent(coin.change_24h()));
    }
    println!();

    // 3. Table sorted by 24h change, largest first
    board.toggle_sort(SortKey::Change24h);
    board.toggle_sort(SortKey::Change24h);
    println!("{:<5} {:<24} {:>14} {:>9} {:>12}", "#", "Name", "Price", "24h", "Market Cap");
    for coin in board.rows().iter().take(20) {
        println!(
            "{:<5} {:<24} {:>14} {:>9} {:>12}",
            coin.rank(),
            coin.name,
            format_usd(coin.price()),
            format_percent(coin.change_24h()),
            format_compact(coin.market_cap())
        );
    }

    let metrics = api.client().metrics().await;
    println!();
    println!(
        "Requests: {} (cache hits: {}, p50 latency: {:.0} ms)",
        metrics.total_requests, metrics.cache_hits, metrics.latency_p50_ms
    );

    Ok(())
}
