/*
[INPUT]:  Raw REST/WebSocket records in atoms + reference cache
[OUTPUT]: Records annotated with exact decimal values and display strings
[POS]:    Formatting layer - reference-aware enrichment
[UPDATE]: When record shapes or display rules change
*/

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::cache::{MarketReference, ReferenceCache};
use crate::format::{format_price, format_size, to_display_value};
use crate::http::{ExchangeError, Result};
use crate::types::{Balance, Order, Side, Token, Trade};
use crate::ws::message::{BalanceUpdate, OrderbookSnapshot, PriceLevel, TradeData};

#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedTrade {
    pub id: String,
    pub market_id: String,
    pub buyer_address: String,
    pub seller_address: String,
    pub buyer_order_id: String,
    pub seller_order_id: String,
    /// Atoms
    pub price: String,
    pub size: String,
    pub side: Option<Side>,
    pub timestamp: DateTime<Utc>,
    pub price_display: String,
    pub size_display: String,
    pub price_value: Decimal,
    pub size_value: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedOrder {
    pub order: Order,
    pub price_display: String,
    pub size_display: String,
    pub filled_display: String,
    pub price_value: Decimal,
    pub size_value: Decimal,
    pub filled_value: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedBalance {
    pub balance: Balance,
    pub amount_display: String,
    pub locked_display: String,
    pub amount_value: Decimal,
    pub locked_value: Decimal,
}

/// Balance push from the user channel with display values
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedBalanceUpdate {
    pub update: BalanceUpdate,
    pub available_display: String,
    pub locked_display: String,
    pub available_value: Decimal,
    pub locked_value: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedOrderbookLevel {
    pub price: String,
    pub size: String,
    pub price_display: String,
    pub size_display: String,
    pub price_value: Decimal,
    pub size_value: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedOrderbook {
    pub market_id: String,
    pub bids: Vec<EnhancedOrderbookLevel>,
    pub asks: Vec<EnhancedOrderbookLevel>,
}

/// Turns atoms into display values using cached market/token decimals
#[derive(Debug, Clone)]
pub struct Enhancer {
    cache: Arc<ReferenceCache>,
}

impl Enhancer {
    pub fn new(cache: Arc<ReferenceCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ReferenceCache> {
        &self.cache
    }

    fn reference(&self, market_id: &str) -> Result<MarketReference> {
        if let Some(reference) = self.cache.lookup(market_id) {
            return Ok(reference);
        }

        match self.cache.market(market_id) {
            None => {
                let available = join_or_none(self.cache.markets().into_iter().map(|m| m.id));
                Err(ExchangeError::validation(format!(
                    "market {market_id} not found in cache (available markets: {available}); \
                     initialize the cache first"
                )))
            }
            Some(market) => {
                let available =
                    join_or_none(self.cache.tokens().into_iter().map(|t| t.ticker));
                Err(ExchangeError::validation(format!(
                    "tokens for market {market_id} not found in cache (need {}, {}; \
                     available: {available})",
                    market.base_ticker, market.quote_ticker
                )))
            }
        }
    }

    fn token(&self, ticker: &str) -> Result<Token> {
        self.cache.token(ticker).ok_or_else(|| {
            ExchangeError::validation(format!(
                "token {ticker} not found in cache; initialize the cache first"
            ))
        })
    }

    /// Enhance a REST trade
    pub fn enhance_trade(&self, trade: &Trade) -> Result<EnhancedTrade> {
        let reference = self.reference(&trade.market_id)?;
        let (base, quote) = (reference.base.decimals, reference.quote.decimals);

        Ok(EnhancedTrade {
            id: trade.id.clone(),
            market_id: trade.market_id.clone(),
            buyer_address: trade.buyer_address.clone(),
            seller_address: trade.seller_address.clone(),
            buyer_order_id: trade.buyer_order_id.clone(),
            seller_order_id: trade.seller_order_id.clone(),
            price: trade.price.clone(),
            size: trade.size.clone(),
            side: Some(trade.side),
            timestamp: trade.timestamp,
            price_display: format_price(&trade.price, quote)?,
            size_display: format_size(&trade.size, base)?,
            price_value: to_display_value(&trade.price, quote)?,
            size_value: to_display_value(&trade.size, base)?,
        })
    }

    /// Enhance a streamed trade; its timestamp is unix seconds
    pub fn enhance_ws_trade(&self, trade: &TradeData) -> Result<EnhancedTrade> {
        let reference = self.reference(&trade.market_id)?;
        let (base, quote) = (reference.base.decimals, reference.quote.decimals);
        let timestamp = DateTime::<Utc>::from_timestamp(trade.timestamp, 0).ok_or_else(|| {
            ExchangeError::validation(format!("trade timestamp {} out of range", trade.timestamp))
        })?;

        Ok(EnhancedTrade {
            id: trade.id.clone(),
            market_id: trade.market_id.clone(),
            buyer_address: trade.buyer_address.clone(),
            seller_address: trade.seller_address.clone(),
            buyer_order_id: trade.buyer_order_id.clone(),
            seller_order_id: trade.seller_order_id.clone(),
            price: trade.price.clone(),
            size: trade.size.clone(),
            side: trade.side,
            timestamp,
            price_display: format_price(&trade.price, quote)?,
            size_display: format_size(&trade.size, base)?,
            price_value: to_display_value(&trade.price, quote)?,
            size_value: to_display_value(&trade.size, base)?,
        })
    }

    pub fn enhance_order(&self, order: &Order) -> Result<EnhancedOrder> {
        let reference = self.reference(&order.market_id)?;
        let (base, quote) = (reference.base.decimals, reference.quote.decimals);

        Ok(EnhancedOrder {
            order: order.clone(),
            price_display: format_price(&order.price, quote)?,
            size_display: format_size(&order.size, base)?,
            filled_display: format_size(&order.filled_size, base)?,
            price_value: to_display_value(&order.price, quote)?,
            size_value: to_display_value(&order.size, base)?,
            filled_value: to_display_value(&order.filled_size, base)?,
        })
    }

    /// Locked amount is the balance's open interest
    pub fn enhance_balance(&self, balance: &Balance) -> Result<EnhancedBalance> {
        let decimals = self.token(&balance.token_ticker)?.decimals;

        Ok(EnhancedBalance {
            balance: balance.clone(),
            amount_display: format_size(&balance.amount, decimals)?,
            locked_display: format_size(&balance.open_interest, decimals)?,
            amount_value: to_display_value(&balance.amount, decimals)?,
            locked_value: to_display_value(&balance.open_interest, decimals)?,
        })
    }

    pub fn enhance_balance_update(&self, update: &BalanceUpdate) -> Result<EnhancedBalanceUpdate> {
        let decimals = self.token(&update.token_ticker)?.decimals;

        Ok(EnhancedBalanceUpdate {
            update: update.clone(),
            available_display: format_size(&update.available, decimals)?,
            locked_display: format_size(&update.locked, decimals)?,
            available_value: to_display_value(&update.available, decimals)?,
            locked_value: to_display_value(&update.locked, decimals)?,
        })
    }

    pub fn enhance_orderbook_level(
        &self,
        level: &PriceLevel,
        market_id: &str,
    ) -> Result<EnhancedOrderbookLevel> {
        let reference = self.reference(market_id)?;
        enhance_level(level, &reference)
    }

    pub fn enhance_orderbook(&self, book: &OrderbookSnapshot) -> Result<EnhancedOrderbook> {
        let reference = self.reference(&book.market_id)?;
        let convert = |levels: &[PriceLevel]| {
            levels
                .iter()
                .map(|level| enhance_level(level, &reference))
                .collect::<Result<Vec<_>>>()
        };

        Ok(EnhancedOrderbook {
            market_id: book.market_id.clone(),
            bids: convert(book.bids.as_slice())?,
            asks: convert(book.asks.as_slice())?,
        })
    }
}

fn enhance_level(
    level: &PriceLevel,
    reference: &MarketReference,
) -> Result<EnhancedOrderbookLevel> {
    let (base, quote) = (reference.base.decimals, reference.quote.decimals);
    Ok(EnhancedOrderbookLevel {
        price: level.price.clone(),
        size: level.size.clone(),
        price_display: format_price(&level.price, quote)?,
        size_display: format_size(&level.size, base)?,
        price_value: to_display_value(&level.price, quote)?,
        size_value: to_display_value(&level.size, base)?,
    })
}

fn join_or_none(items: impl Iterator<Item = String>) -> String {
    let joined = items.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "none".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fixtures::{btc_usdc, market, token};
    use std::str::FromStr;

    fn ws_trade() -> TradeData {
        TradeData {
            id: "t-1".to_string(),
            market_id: "BTC/USDC".to_string(),
            buyer_address: "0xbuyer".to_string(),
            seller_address: "0xseller".to_string(),
            buyer_order_id: "b-1".to_string(),
            seller_order_id: "s-1".to_string(),
            price: "110000500000".to_string(),
            size: "50000000".to_string(),
            side: Some(Side::Buy),
            timestamp: 1_704_067_200,
        }
    }

    fn ready_enhancer() -> Enhancer {
        let cache = Arc::new(ReferenceCache::new());
        cache.populate(btc_usdc());
        Enhancer::new(cache)
    }

    #[test]
    fn ws_trade_gets_display_values() {
        let enhanced = ready_enhancer().enhance_ws_trade(&ws_trade()).expect("enhance");

        assert_eq!(enhanced.price_display, "110,000.5");
        assert_eq!(enhanced.size_display, "0.5");
        assert_eq!(enhanced.price_value, Decimal::from_str("110000.50").expect("decimal"));
        assert_eq!(enhanced.timestamp.timestamp(), 1_704_067_200);
    }

    #[test]
    fn unknown_market_lists_available() {
        let mut trade = ws_trade();
        trade.market_id = "ETH/USDC".to_string();

        let err = ready_enhancer().enhance_ws_trade(&trade).expect_err("should fail");
        match err {
            ExchangeError::Validation(message) => {
                assert!(message.contains("ETH/USDC"));
                assert!(message.contains("BTC/USDC"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn missing_tokens_name_what_is_needed() {
        let cache = Arc::new(ReferenceCache::new());
        cache.set_markets(vec![market("BTC", "USDC")]);
        cache.set_tokens(vec![token("BTC", 8)]);
        let err = Enhancer::new(cache)
            .enhance_ws_trade(&ws_trade())
            .expect_err("should fail");

        assert!(err.to_string().contains("need BTC, USDC"));
    }

    #[test]
    fn orderbook_levels_use_market_decimals() {
        let book = OrderbookSnapshot {
            market_id: "BTC/USDC".to_string(),
            bids: vec![PriceLevel {
                price: "1000000000".to_string(),
                size: "100000000".to_string(),
            }],
            asks: vec![PriceLevel {
                price: "999990000".to_string(),
                size: "1".to_string(),
            }],
        };

        let enhanced = ready_enhancer().enhance_orderbook(&book).expect("enhance");

        assert_eq!(enhanced.bids[0].price_display, "1,000");
        assert_eq!(enhanced.bids[0].size_display, "1");
        assert_eq!(enhanced.asks[0].price_display, "999.99");
        assert_eq!(enhanced.asks[0].size_display, "0.00000001");
    }

    #[test]
    fn balance_update_uses_token_decimals() {
        let update = BalanceUpdate {
            token_ticker: "USDC".to_string(),
            available: "1500250000".to_string(),
            locked: "0".to_string(),
        };

        let enhanced = ready_enhancer()
            .enhance_balance_update(&update)
            .expect("enhance");

        assert_eq!(enhanced.available_display, "1,500.25");
        assert_eq!(enhanced.locked_display, "0");
    }
}
