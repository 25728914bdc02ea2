/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust request enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

use super::enums::{CandleInterval, OrderType, Side};

/// Body of `POST /api/info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InfoRequest {
    TokenDetails { ticker: String },
    MarketDetails { market_id: String },
    AllMarkets,
    AllTokens,
}

/// Body of `POST /api/candles`. `from` and `to` are unix seconds, both inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlesRequest {
    pub market_id: String,
    pub interval: CandleInterval,
    pub from: i64,
    pub to: i64,
    /// Keep only the most recent bars before `to`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_back: Option<u32>,
}

/// Body of `POST /api/user`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserRequest {
    Orders {
        user_address: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        market_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
    },
    Balances {
        user_address: String,
    },
    Trades {
        user_address: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        market_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
    },
}

/// Body of `POST /api/trade`. Signatures are produced by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TradeRequest {
    PlaceOrder {
        user_address: String,
        market_id: String,
        side: Side,
        order_type: OrderType,
        price: String,
        size: String,
        signature: String,
    },
    CancelOrder {
        user_address: String,
        order_id: String,
        signature: String,
    },
    CancelAllOrders {
        user_address: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        market_id: Option<String>,
        signature: String,
    },
}
