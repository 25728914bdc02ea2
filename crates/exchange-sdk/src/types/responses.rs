/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust response enums/structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

use super::models::{Balance, Candle, Market, Order, Token, Trade};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InfoResponse {
    TokenDetails { token: Token },
    MarketDetails { market: Market },
    AllMarkets { markets: Vec<Market> },
    AllTokens { tokens: Vec<Token> },
}

/// Oldest bar first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlesResponse {
    pub candles: Vec<Candle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserResponse {
    Orders { orders: Vec<Order> },
    Balances { balances: Vec<Balance> },
    Trades { trades: Vec<Trade> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TradeResponse {
    PlaceOrder {
        order: Order,
        trades: Vec<Trade>,
    },
    CancelOrder {
        order_id: String,
    },
    CancelAllOrders {
        cancelled_order_ids: Vec<String>,
        count: usize,
    },
}

/// Error body returned with non-2xx responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Result of placing an order, including any immediate fills
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlaced {
    pub order: Order,
    pub trades: Vec<Trade>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdersCancelled {
    pub cancelled_order_ids: Vec<String>,
    pub count: usize,
}
