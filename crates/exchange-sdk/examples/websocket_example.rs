/*
[INPUT]:  REST base url (EXCHANGE_URL) and market id (first argument)
[OUTPUT]: Live trades and order book tops printed in display units
[POS]:    Examples - WebSocket stream handling
[UPDATE]: When WebSocket API changes
*/

use exchange_sdk::*;
use tokio::time::{Duration, sleep};

/// Example: stream trades and order book snapshots for one market
///
/// The reference cache is loaded first so every message can be rendered
/// with display prices; messages arriving earlier are skipped.
#[tokio::main]
async fn main() {
    println!("=== Exchange WebSocket Example ===\n");

    let rest_url =
        std::env::var("EXCHANGE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let market_id = std::env::args().nth(1).unwrap_or_else(|| "BTC/USDC".to_string());

    let client = match ExchangeClient::new(ExchangeConfig::new(rest_url)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };

    if let Err(e) = client.initialize_cache().await {
        eprintln!("✗ Could not load reference data: {}", e);
        return;
    }
    println!("✓ Reference data loaded");

    let trades = client.on_trades(&market_id, |trade| {
        println!(
            "trade  {} {:>14} @ {:>14}",
            trade.market_id, trade.size_display, trade.price_display
        );
    });
    let books = client.on_orderbook(&market_id, |book| {
        let bid = book.bids.first().map(|l| l.price_display.as_str()).unwrap_or("-");
        let ask = book.asks.first().map(|l| l.price_display.as_str()).unwrap_or("-");
        println!("book   {} bid {:>14} ask {:>14}", book.market_id, bid, ask);
    });
    let (trades, books) = match (trades, books) {
        (Ok(t), Ok(b)) => (t, b),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("✗ Could not subscribe: {}", e);
            return;
        }
    };

    if let Err(e) = client.connect() {
        eprintln!("✗ Could not start stream: {}", e);
        return;
    }
    println!("✓ Streaming {} for 30 seconds...\n", market_id);

    sleep(Duration::from_secs(30)).await;

    trades.unsubscribe();
    books.unsubscribe();
    client.close().await;
    println!("\n✓ WebSocket example complete");
}
