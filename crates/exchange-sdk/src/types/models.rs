/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use super::enums::{OrderStatus, OrderType, Side};

// Amounts stay in atoms (integer strings) on the wire; see `crate::format` for display values.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub ticker: String,
    pub decimals: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Generated as `base_ticker/quote_ticker`
    pub id: String,
    pub base_ticker: String,
    pub quote_ticker: String,
    pub tick_size: String,
    pub lot_size: String,
    pub min_size: String,
    pub maker_fee_bps: i32,
    pub taker_fee_bps: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_address: String,
    pub market_id: String,
    pub price: String,
    pub size: String,
    pub side: Side,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub filled_size: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub market_id: String,
    pub buyer_address: String,
    pub seller_address: String,
    pub buyer_order_id: String,
    pub seller_order_id: String,
    pub price: String,
    pub size: String,
    /// Taker side
    pub side: Side,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub user_address: String,
    pub token_ticker: String,
    pub amount: String,
    pub open_interest: String,
    pub updated_at: DateTime<Utc>,
}

/// OHLCV candle. `timestamp` is the bar open in unix seconds; prices and volume are atoms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    #[serde(deserialize_with = "atoms")]
    pub open: String,
    #[serde(deserialize_with = "atoms")]
    pub high: String,
    #[serde(deserialize_with = "atoms")]
    pub low: String,
    #[serde(deserialize_with = "atoms")]
    pub close: String,
    #[serde(deserialize_with = "atoms")]
    pub volume: String,
}

// The candles endpoint sends atoms as bare integers, everything else sends strings.
fn atoms<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct AtomsVisitor;

    impl Visitor<'_> for AtomsVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("atoms as an integer string or unsigned integer")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_u128<E: de::Error>(self, value: u128) -> Result<String, E> {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(AtomsVisitor)
}

/// Market and token metadata needed to turn atoms into display values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    pub markets: Vec<Market>,
    pub tokens: Vec<Token>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trade_deserializes_rfc3339_timestamp() {
        let value = json!({
            "id": "4f7c2f1e-0000-0000-0000-000000000001",
            "market_id": "BTC/USDC",
            "buyer_address": "0xbuyer",
            "seller_address": "0xseller",
            "buyer_order_id": "b-1",
            "seller_order_id": "s-1",
            "price": "110000500000",
            "size": "50000000",
            "side": "buy",
            "timestamp": "2024-01-01T00:00:00Z"
        });

        let trade: Trade = serde_json::from_value(value).expect("trade should deserialize");

        assert_eq!(trade.side, Side::Buy);
        assert_eq!(trade.timestamp.timestamp(), 1_704_067_200);
    }

    #[test]
    fn order_deserializes_status_and_type() {
        let value = json!({
            "id": "o-1",
            "user_address": "0xabc",
            "market_id": "BTC/USDC",
            "price": "100",
            "size": "1",
            "side": "sell",
            "order_type": "limit",
            "status": "partially_filled",
            "filled_size": "0",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:01Z"
        });

        let order: Order = serde_json::from_value(value).expect("order should deserialize");

        assert_eq!(order.order_type, OrderType::Limit);
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
    }

    #[test]
    fn candle_accepts_integer_or_string_atoms() {
        let value = json!({
            "timestamp": 1_704_067_200,
            "open": 110_000_000_000u64,
            "high": "110500000000",
            "low": 109_900_000_000u64,
            "close": "110250000000",
            "volume": 0
        });

        let candle: Candle = serde_json::from_value(value).expect("candle should deserialize");

        assert_eq!(candle.open, "110000000000");
        assert_eq!(candle.high, "110500000000");
        assert_eq!(candle.volume, "0");
        assert!(serde_json::from_value::<Candle>(json!({
            "timestamp": 0, "open": -1, "high": "1", "low": "1", "close": "1", "volume": "1"
        }))
        .is_err());
    }
}
