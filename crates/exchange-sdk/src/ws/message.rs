/*
[INPUT]:  Raw WebSocket text frames and subscription intents
[OUTPUT]: Typed client/server messages and their wire encodings
[POS]:    WebSocket layer - message parsing and validation
[UPDATE]: When adding new message types or changing format
*/

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::http::Result;
use crate::types::{OrderStatus, Side, SubscriptionChannel};

/// Identity of one server-side subscription.
///
/// Two subscriptions are the same key when channel and identifier match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subscription {
    Trades { market_id: String },
    Orderbook { market_id: String },
    User { user_address: String },
}

impl Subscription {
    pub fn trades(market_id: impl Into<String>) -> Self {
        Subscription::Trades {
            market_id: market_id.into(),
        }
    }

    pub fn orderbook(market_id: impl Into<String>) -> Self {
        Subscription::Orderbook {
            market_id: market_id.into(),
        }
    }

    pub fn user(user_address: impl Into<String>) -> Self {
        Subscription::User {
            user_address: user_address.into(),
        }
    }

    pub fn channel(&self) -> SubscriptionChannel {
        match self {
            Subscription::Trades { .. } => SubscriptionChannel::Trades,
            Subscription::Orderbook { .. } => SubscriptionChannel::Orderbook,
            Subscription::User { .. } => SubscriptionChannel::User,
        }
    }

    /// Market id or user address
    pub fn identifier(&self) -> &str {
        match self {
            Subscription::Trades { market_id } | Subscription::Orderbook { market_id } => {
                market_id
            }
            Subscription::User { user_address } => user_address,
        }
    }

    fn market_id(&self) -> Option<&str> {
        match self {
            Subscription::Trades { market_id } | Subscription::Orderbook { market_id } => {
                Some(market_id)
            }
            Subscription::User { .. } => None,
        }
    }

    fn user_address(&self) -> Option<&str> {
        match self {
            Subscription::User { user_address } => Some(user_address),
            _ => None,
        }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel(), self.identifier())
    }
}

/// Frames sent by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Subscribe(Subscription),
    Unsubscribe(Subscription),
    Ping,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireMessage<'a> {
    Subscribe {
        channel: SubscriptionChannel,
        market_id: Option<&'a str>,
        user_address: Option<&'a str>,
    },
    Unsubscribe {
        channel: SubscriptionChannel,
        market_id: Option<&'a str>,
        user_address: Option<&'a str>,
    },
    Ping,
}

impl Serialize for ClientMessage {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let wire = match self {
            ClientMessage::Subscribe(sub) => WireMessage::Subscribe {
                channel: sub.channel(),
                market_id: sub.market_id(),
                user_address: sub.user_address(),
            },
            ClientMessage::Unsubscribe(sub) => WireMessage::Unsubscribe {
                channel: sub.channel(),
                market_id: sub.market_id(),
                user_address: sub.user_address(),
            },
            ClientMessage::Ping => WireMessage::Ping,
        };
        wire.serialize(serializer)
    }
}

impl ClientMessage {
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Trade as pushed on the `trades` channel. Timestamp is unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TradeData {
    pub id: String,
    pub market_id: String,
    pub buyer_address: String,
    pub seller_address: String,
    pub buyer_order_id: String,
    pub seller_order_id: String,
    pub price: String,
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PriceLevel {
    pub price: String,
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderbookSnapshot {
    pub market_id: String,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

/// Order status change on the `user` channel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderUpdate {
    pub order_id: String,
    pub status: OrderStatus,
    pub filled_size: String,
}

/// Balance change on the `user` channel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BalanceUpdate {
    pub token_ticker: String,
    pub available: String,
    pub locked: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CandleUpdate {
    pub market_id: String,
    pub timestamp: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

/// Frames pushed by the server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Subscribed {
        channel: SubscriptionChannel,
        #[serde(default)]
        market_id: Option<String>,
        #[serde(default)]
        user_address: Option<String>,
    },
    Unsubscribed {
        channel: SubscriptionChannel,
        #[serde(default)]
        market_id: Option<String>,
        #[serde(default)]
        user_address: Option<String>,
    },
    Trade {
        trade: TradeData,
    },
    Orderbook {
        orderbook: OrderbookSnapshot,
    },
    Order(OrderUpdate),
    Balance(BalanceUpdate),
    Candle(CandleUpdate),
    Error {
        message: String,
    },
    Pong,
}

/// Dispatch tag for server messages that reach handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Subscribed,
    Unsubscribed,
    Trade,
    Orderbook,
    Order,
    Balance,
    Candle,
    Error,
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// `None` for pong, which is consumed by the liveness monitor
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            ServerMessage::Subscribed { .. } => Some(MessageKind::Subscribed),
            ServerMessage::Unsubscribed { .. } => Some(MessageKind::Unsubscribed),
            ServerMessage::Trade { .. } => Some(MessageKind::Trade),
            ServerMessage::Orderbook { .. } => Some(MessageKind::Orderbook),
            ServerMessage::Order(_) => Some(MessageKind::Order),
            ServerMessage::Balance(_) => Some(MessageKind::Balance),
            ServerMessage::Candle(_) => Some(MessageKind::Candle),
            ServerMessage::Error { .. } => Some(MessageKind::Error),
            ServerMessage::Pong => None,
        }
    }
}
