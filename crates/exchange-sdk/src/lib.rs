/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public exchange SDK crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod cache;
pub mod enhancement;
pub mod format;
pub mod http;
pub mod sdk;
pub mod types;
pub mod ws;

pub use cache::{CacheStats, MarketReference, ReferenceCache};

pub use enhancement::{
    EnhancedBalance,
    EnhancedBalanceUpdate,
    EnhancedOrder,
    EnhancedOrderbook,
    EnhancedOrderbookLevel,
    EnhancedTrade,
    Enhancer,
};

pub use format::{format_number, format_price, format_size, to_atoms, to_display_value};

// Re-export commonly used types from http
pub use http::{ClientConfig, ExchangeError, ExchangeHttpClient, PlaceOrderParams, Result};

pub use sdk::{ExchangeClient, ExchangeConfig, derive_ws_url};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{
    BalanceUpdate,
    ConnectionState,
    MessageKind,
    OrderUpdate,
    ServerMessage,
    StreamSubscription,
    Subscription,
    WebSocketClient,
    WsConfig,
};
