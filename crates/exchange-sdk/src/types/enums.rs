/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "partially_filled", alias = "partial_filled")]
    PartiallyFilled,
    #[serde(rename = "filled")]
    Filled,
    #[serde(rename = "cancelled", alias = "canceled")]
    Cancelled,
}

/// WebSocket subscription channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionChannel {
    Trades,
    Orderbook,
    User,
}

impl SubscriptionChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionChannel::Trades => "trades",
            SubscriptionChannel::Orderbook => "orderbook",
            SubscriptionChannel::User => "user",
        }
    }
}

impl fmt::Display for SubscriptionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bar width accepted by the candles endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandleInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
}

impl CandleInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandleInterval::OneMinute => "1m",
            CandleInterval::FiveMinutes => "5m",
            CandleInterval::FifteenMinutes => "15m",
            CandleInterval::OneHour => "1h",
            CandleInterval::OneDay => "1d",
        }
    }
}

impl fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_accepts_both_spellings() {
        let cancelled: OrderStatus = serde_json::from_str("\"canceled\"").expect("alias");
        assert_eq!(cancelled, OrderStatus::Cancelled);
        let partial: OrderStatus = serde_json::from_str("\"partially_filled\"").expect("status");
        assert_eq!(partial, OrderStatus::PartiallyFilled);
    }

    #[test]
    fn channel_wire_name_matches_display() {
        for channel in [
            SubscriptionChannel::Trades,
            SubscriptionChannel::Orderbook,
            SubscriptionChannel::User,
        ] {
            let wire = serde_json::to_string(&channel).expect("serialize");
            assert_eq!(wire, format!("\"{}\"", channel));
        }
    }

    #[test]
    fn candle_interval_uses_short_wire_names() {
        let wire = serde_json::to_string(&CandleInterval::FifteenMinutes).expect("serialize");
        assert_eq!(wire, "\"15m\"");
        let parsed: CandleInterval = serde_json::from_str("\"1d\"").expect("deserialize");
        assert_eq!(parsed, CandleInterval::OneDay);
        assert!(serde_json::from_str::<CandleInterval>("\"2h\"").is_err());
    }
}
