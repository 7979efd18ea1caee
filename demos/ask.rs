use market_dashboard_sdk::assistant::{ChatSession, GeminiModel};
use market_dashboard_sdk::{logging, MarketDataApi};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let question = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let question = if question.trim().is_empty() {
        "What is the price of bitcoin?".to_string()
    } else {
        question
    };

    // Needs GEMINI_API_KEY (or API_KEY)
    let model = GeminiModel::from_env()?;
    let config = model.config().clone();
    let mut chat = ChatSession::with_config(Arc::new(model), MarketDataApi::new()?, &config);

    println!("> {}", question);
    match chat.send(&question).await {
        Ok(Some(reply)) => println!("{}", reply.text),
        Ok(None) => {}
        Err(e) => eprintln!("Error: {}", e),
    }

    Ok(())
}
