/*
[INPUT]:  ExchangeConfig (REST url, optional WebSocket settings)
[OUTPUT]: One client combining REST, reference cache, enhancement and streams
[POS]:    SDK facade - entry point for applications
[UPDATE]: When adding endpoints or stream kinds that applications need
*/

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;

use crate::cache::ReferenceCache;
use crate::enhancement::{EnhancedOrderbook, EnhancedTrade, Enhancer};
use crate::http::{ClientConfig, ExchangeError, ExchangeHttpClient, PlaceOrderParams, Result};
use crate::types::{
    Balance, Candle, CandleInterval, Market, Order, OrderPlaced, OrdersCancelled, Token, Trade,
};
use crate::ws::backoff::DEFAULT_RECONNECT_DELAYS;
use crate::ws::config::{DEFAULT_PING_INTERVAL, DEFAULT_PONG_TIMEOUT};
use crate::ws::{
    BalanceUpdate, OrderUpdate, StreamSubscription, Transport, WebSocketClient, WsConfig,
};

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub rest_url: String,
    /// Derived from `rest_url` when unset
    pub ws_url: Option<String>,
    /// Build a WebSocket client alongside the REST client
    pub websocket: bool,
    pub http: ClientConfig,
    pub reconnect_delays: Vec<Duration>,
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
}

impl ExchangeConfig {
    pub fn new(rest_url: impl Into<String>) -> Self {
        Self {
            rest_url: rest_url.into(),
            ws_url: None,
            websocket: true,
            http: ClientConfig::default(),
            reconnect_delays: DEFAULT_RECONNECT_DELAYS.to_vec(),
            ping_interval: DEFAULT_PING_INTERVAL,
            pong_timeout: DEFAULT_PONG_TIMEOUT,
        }
    }

    pub fn ws_config(&self) -> Result<WsConfig> {
        let url = match &self.ws_url {
            Some(url) => url.clone(),
            None => derive_ws_url(&self.rest_url)?,
        };
        Ok(WsConfig {
            url,
            reconnect_delays: self.reconnect_delays.clone(),
            ping_interval: self.ping_interval,
            pong_timeout: self.pong_timeout,
            connect_timeout: self.http.connect_timeout,
        })
    }
}

/// `http://host` -> `ws://host/ws`, `https://host` -> `wss://host/ws`
pub fn derive_ws_url(rest_url: &str) -> Result<String> {
    let trimmed = rest_url.trim_end_matches('/');
    let rest = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(ExchangeError::Config(format!(
            "cannot derive websocket url from {rest_url}"
        )));
    };
    Ok(format!("{rest}/ws"))
}

/// Unified exchange client
#[derive(Debug)]
pub struct ExchangeClient {
    http: ExchangeHttpClient,
    cache: Arc<ReferenceCache>,
    enhancer: Enhancer,
    ws: Option<WebSocketClient>,
    init_lock: Mutex<()>,
}

impl ExchangeClient {
    pub fn new(config: ExchangeConfig) -> Result<Self> {
        let cache = Arc::new(ReferenceCache::new());
        let ws = if config.websocket {
            Some(WebSocketClient::new(config.ws_config()?, Arc::clone(&cache))?)
        } else {
            None
        };
        Self::assemble(config, cache, ws)
    }

    /// Build with a custom WebSocket transport
    pub fn with_transport(config: ExchangeConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let cache = Arc::new(ReferenceCache::new());
        let ws =
            WebSocketClient::with_transport(config.ws_config()?, Arc::clone(&cache), transport)?;
        Self::assemble(config, cache, Some(ws))
    }

    fn assemble(
        config: ExchangeConfig,
        cache: Arc<ReferenceCache>,
        ws: Option<WebSocketClient>,
    ) -> Result<Self> {
        let http = ExchangeHttpClient::with_config(config.http, &config.rest_url)?;
        Ok(Self {
            http,
            enhancer: Enhancer::new(Arc::clone(&cache)),
            cache,
            ws,
            init_lock: Mutex::new(()),
        })
    }

    pub fn http(&self) -> &ExchangeHttpClient {
        &self.http
    }

    pub fn cache(&self) -> &Arc<ReferenceCache> {
        &self.cache
    }

    pub fn enhancer(&self) -> &Enhancer {
        &self.enhancer
    }

    pub fn websocket(&self) -> Result<&WebSocketClient> {
        self.ws
            .as_ref()
            .ok_or_else(|| ExchangeError::Config("websocket not enabled".to_string()))
    }

    /// Load markets and tokens once. Concurrent callers wait for the same load;
    /// a failed load leaves the cache empty so the next call retries.
    pub async fn initialize_cache(&self) -> Result<()> {
        if self.cache.is_ready() {
            return Ok(());
        }
        let _guard = self.init_lock.lock().await;
        if self.cache.is_ready() {
            return Ok(());
        }

        let reference = self.http.fetch_reference_set().await?;
        info!(
            markets = reference.markets.len(),
            tokens = reference.tokens.len(),
            "reference data fetched"
        );
        self.cache.populate(reference);
        Ok(())
    }

    pub async fn get_markets(&self) -> Result<Vec<Market>> {
        self.initialize_cache().await?;
        Ok(self.cache.markets())
    }

    pub async fn get_tokens(&self) -> Result<Vec<Token>> {
        self.initialize_cache().await?;
        Ok(self.cache.tokens())
    }

    pub async fn get_market(&self, market_id: &str) -> Result<Market> {
        match self.cache.market(market_id) {
            Some(market) => Ok(market),
            None => self.http.get_market(market_id).await,
        }
    }

    pub async fn get_token(&self, ticker: &str) -> Result<Token> {
        match self.cache.token(ticker) {
            Some(token) => Ok(token),
            None => self.http.get_token(ticker).await,
        }
    }

    pub async fn get_orders(
        &self,
        user_address: &str,
        market_id: Option<&str>,
        status: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Order>> {
        self.http.get_orders(user_address, market_id, status, limit).await
    }

    pub async fn get_balances(&self, user_address: &str) -> Result<Vec<Balance>> {
        self.http.get_balances(user_address).await
    }

    pub async fn get_trades(
        &self,
        user_address: &str,
        market_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Trade>> {
        self.http.get_trades(user_address, market_id, limit).await
    }

    pub async fn get_candles(
        &self,
        market_id: &str,
        interval: CandleInterval,
        from: i64,
        to: i64,
        count_back: Option<u32>,
    ) -> Result<Vec<Candle>> {
        self.http.get_candles(market_id, interval, from, to, count_back).await
    }

    pub async fn place_order(&self, params: PlaceOrderParams) -> Result<OrderPlaced> {
        self.http.place_order(params).await
    }

    pub async fn cancel_order(
        &self,
        user_address: &str,
        order_id: &str,
        signature: &str,
    ) -> Result<String> {
        self.http.cancel_order(user_address, order_id, signature).await
    }

    pub async fn cancel_all_orders(
        &self,
        user_address: &str,
        market_id: Option<&str>,
        signature: &str,
    ) -> Result<OrdersCancelled> {
        self.http
            .cancel_all_orders(user_address, market_id, signature)
            .await
    }

    /// Start the WebSocket worker
    pub fn connect(&self) -> Result<()> {
        self.websocket()?.start()
    }

    pub fn on_trades<F>(&self, market_id: &str, callback: F) -> Result<StreamSubscription>
    where
        F: Fn(EnhancedTrade) + Send + Sync + 'static,
    {
        Ok(self.websocket()?.on_trades(market_id, callback))
    }

    pub fn on_orderbook<F>(&self, market_id: &str, callback: F) -> Result<StreamSubscription>
    where
        F: Fn(EnhancedOrderbook) + Send + Sync + 'static,
    {
        Ok(self.websocket()?.on_orderbook(market_id, callback))
    }

    pub fn on_user_orders<F>(&self, user_address: &str, callback: F) -> Result<StreamSubscription>
    where
        F: Fn(OrderUpdate) + Send + Sync + 'static,
    {
        Ok(self.websocket()?.on_user_orders(user_address, callback))
    }

    pub fn on_user_trades<F>(&self, user_address: &str, callback: F) -> Result<StreamSubscription>
    where
        F: Fn(EnhancedTrade) + Send + Sync + 'static,
    {
        Ok(self.websocket()?.on_user_trades(user_address, callback))
    }

    pub fn on_user_balances<F>(
        &self,
        user_address: &str,
        callback: F,
    ) -> Result<StreamSubscription>
    where
        F: Fn(BalanceUpdate) + Send + Sync + 'static,
    {
        Ok(self.websocket()?.on_user_balances(user_address, callback))
    }

    /// Close the stream if one was configured
    pub async fn close(&self) {
        if let Some(ws) = &self.ws {
            ws.close().await;
        }
    }
}
