/*
[INPUT]:  Stream callbacks (trades, order books, user orders and balances)
[OUTPUT]: Snapshot-friendly per-market and per-user counters for summary logs
[POS]:    Shared runtime metrics between stream callbacks and the summary loop
[UPDATE]: When adding/removing stream-level runtime signals
*/

use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::Decimal;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketMetrics {
    pub trades: u64,
    pub orderbooks: u64,
    pub last_price: Option<Decimal>,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub last_update: Option<Instant>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserMetrics {
    pub orders: u64,
    pub balances: u64,
    pub fills: u64,
    pub last_update: Option<Instant>,
}

#[derive(Debug, Clone, Default)]
pub struct StreamMetricsSnapshot {
    pub markets: BTreeMap<String, MarketMetrics>,
    pub users: BTreeMap<String, UserMetrics>,
}

impl StreamMetricsSnapshot {
    pub fn total_events(&self) -> u64 {
        let market_events: u64 = self.markets.values().map(|m| m.trades + m.orderbooks).sum();
        let user_events: u64 = self
            .users
            .values()
            .map(|u| u.orders + u.balances + u.fills)
            .sum();
        market_events + user_events
    }
}

#[derive(Debug, Default)]
pub struct StreamMetrics {
    markets: BTreeMap<String, MarketMetrics>,
    users: BTreeMap<String, UserMetrics>,
}

impl StreamMetrics {
    pub fn snapshot(&self) -> StreamMetricsSnapshot {
        StreamMetricsSnapshot {
            markets: self.markets.clone(),
            users: self.users.clone(),
        }
    }

    pub fn record_trade(&mut self, market_id: &str, price: Decimal) {
        let market = self.markets.entry(market_id.to_string()).or_default();
        market.trades += 1;
        market.last_price = Some(price);
        market.last_update = Some(Instant::now());
    }

    pub fn record_orderbook(
        &mut self,
        market_id: &str,
        best_bid: Option<Decimal>,
        best_ask: Option<Decimal>,
    ) {
        let market = self.markets.entry(market_id.to_string()).or_default();
        market.orderbooks += 1;
        market.best_bid = best_bid;
        market.best_ask = best_ask;
        market.last_update = Some(Instant::now());
    }

    pub fn record_order(&mut self, user_address: &str) {
        let user = self.users.entry(user_address.to_string()).or_default();
        user.orders += 1;
        user.last_update = Some(Instant::now());
    }

    pub fn record_balance(&mut self, user_address: &str) {
        let user = self.users.entry(user_address.to_string()).or_default();
        user.balances += 1;
        user.last_update = Some(Instant::now());
    }

    pub fn record_fill(&mut self, user_address: &str) {
        let user = self.users.entry(user_address.to_string()).or_default();
        user.fills += 1;
        user.last_update = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_counters_accumulate_per_key() {
        let mut metrics = StreamMetrics::default();
        metrics.record_trade("BTC/USDC", Decimal::new(1100005, 1));
        metrics.record_trade("BTC/USDC", Decimal::new(110001, 0));
        metrics.record_orderbook("BTC/USDC", Some(Decimal::new(110000, 0)), None);
        metrics.record_order("0xabc");
        metrics.record_fill("0xabc");

        let snapshot = metrics.snapshot();
        let btc = &snapshot.markets["BTC/USDC"];
        assert_eq!(btc.trades, 2);
        assert_eq!(btc.orderbooks, 1);
        assert_eq!(btc.last_price, Some(Decimal::new(110001, 0)));
        assert_eq!(btc.best_ask, None);
        assert_eq!(snapshot.users["0xabc"].orders, 1);
        assert_eq!(snapshot.total_events(), 5);
    }
}
