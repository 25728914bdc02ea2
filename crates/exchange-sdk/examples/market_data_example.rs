/*
[INPUT]:  REST base url (EXCHANGE_URL, default http://localhost:3000)
[OUTPUT]: Markets and tokens with display-formatted parameters
[POS]:    Examples - public reference data queries
[UPDATE]: When adding new info endpoints
*/

use exchange_sdk::*;

/// Example: load reference data and print market parameters in display units
#[tokio::main]
async fn main() {
    println!("=== Exchange Market Data Example ===\n");

    let rest_url =
        std::env::var("EXCHANGE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let mut config = ExchangeConfig::new(rest_url);
    config.websocket = false;

    let client = match ExchangeClient::new(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };
    println!("✓ Client created\n");

    if let Err(e) = client.initialize_cache().await {
        eprintln!("✗ Could not load reference data: {}", e);
        return;
    }
    let stats = client.cache().stats();
    println!("✓ Loaded {} markets and {} tokens\n", stats.markets, stats.tokens);

    for token in client.cache().tokens() {
        println!("  {:<8} {:>2} decimals  {}", token.ticker, token.decimals, token.name);
    }
    println!();

    for market in client.cache().markets() {
        let Some(reference) = client.cache().lookup(&market.id) else {
            continue;
        };
        let tick = format_price(&market.tick_size, reference.quote.decimals)
            .unwrap_or_else(|e| format!("invalid ({e})"));
        let lot = format_size(&market.lot_size, reference.base.decimals)
            .unwrap_or_else(|e| format!("invalid ({e})"));
        println!("  {:<12} tick {:<12} lot {:<12}", market.id, tick, lot);
    }

    println!("\n✓ Market data example complete");
}
