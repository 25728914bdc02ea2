/*
[INPUT]:  WebSocket configuration and subscription channels
[OUTPUT]: Real-time market data and account updates
[POS]:    WebSocket layer - real-time data streams
[UPDATE]: When adding new channels or changing connection logic
*/

pub mod backoff;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod liveness;
pub mod message;
pub mod queue;
pub mod registry;
pub mod streams;
pub mod transport;

pub use backoff::BackoffPolicy;
pub use client::{ConnectionState, WebSocketClient};
pub use config::WsConfig;
pub use dispatcher::{Handler, HandlerError, HandlerResult, Registration, handler};
pub use message::{
    BalanceUpdate, CandleUpdate, ClientMessage, MessageKind, OrderUpdate, OrderbookSnapshot,
    PriceLevel, ServerMessage, Subscription, TradeData,
};
pub use streams::StreamSubscription;
pub use transport::{Session, Transport, TransportError, TungsteniteTransport};
