/*
[INPUT]:  StreamConfig (markets, users), shutdown token
[OUTPUT]: Display-ready stream events in the log + periodic per-market summaries
[POS]:    Runtime layer - wires configured targets to SDK stream façades
[UPDATE]: When changing which streams are registered or how events are reported
*/

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use exchange_sdk::{ExchangeClient, StreamSubscription};

use crate::config::StreamConfig;
use crate::metrics::{StreamMetrics, StreamMetricsSnapshot};

/// Runs every configured stream until shutdown
#[derive(Debug)]
pub struct StreamRunner {
    config: StreamConfig,
    client: Arc<ExchangeClient>,
    metrics: Arc<Mutex<StreamMetrics>>,
    subscriptions: Vec<StreamSubscription>,
}

impl StreamRunner {
    pub fn new(config: StreamConfig) -> Result<Self> {
        let exchange = config.exchange_config()?;
        let client = ExchangeClient::new(exchange).context("build exchange client")?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    pub fn with_client(config: StreamConfig, client: Arc<ExchangeClient>) -> Self {
        Self {
            config,
            client,
            metrics: Arc::new(Mutex::new(StreamMetrics::default())),
            subscriptions: Vec::new(),
        }
    }

    pub fn client(&self) -> &Arc<ExchangeClient> {
        &self.client
    }

    pub fn metrics(&self) -> StreamMetricsSnapshot {
        lock(&self.metrics).snapshot()
    }

    /// Register the façades for every configured market and user.
    /// Returns the number of façades registered.
    pub fn subscribe_all(&mut self) -> Result<usize> {
        let markets = self.config.markets.clone();
        for market_id in &markets {
            self.subscribe_market(market_id)?;
        }
        let users = self.config.users.clone();
        for user_address in &users {
            self.subscribe_user(user_address)?;
        }
        Ok(self.subscriptions.len())
    }

    fn subscribe_market(&mut self, market_id: &str) -> Result<()> {
        let metrics = Arc::clone(&self.metrics);
        let trades = self.client.on_trades(market_id, move |trade| {
            lock(&metrics).record_trade(&trade.market_id, trade.price_value);
            info!(
                market_id = %trade.market_id,
                side = ?trade.side,
                price = %trade.price_display,
                size = %trade.size_display,
                "trade"
            );
        })?;
        self.subscriptions.push(trades);

        if self.config.orderbook {
            let metrics = Arc::clone(&self.metrics);
            let books = self.client.on_orderbook(market_id, move |book| {
                let best_bid = book.bids.first();
                let best_ask = book.asks.first();
                lock(&metrics).record_orderbook(
                    &book.market_id,
                    best_bid.map(|level| level.price_value),
                    best_ask.map(|level| level.price_value),
                );
                debug!(
                    market_id = %book.market_id,
                    bid = best_bid.map(|level| level.price_display.as_str()).unwrap_or("-"),
                    ask = best_ask.map(|level| level.price_display.as_str()).unwrap_or("-"),
                    depth = book.bids.len() + book.asks.len(),
                    "orderbook"
                );
            })?;
            self.subscriptions.push(books);
        }
        Ok(())
    }

    fn subscribe_user(&mut self, user_address: &str) -> Result<()> {
        let user = user_address.to_string();

        let metrics = Arc::clone(&self.metrics);
        let owner = user.clone();
        let orders = self.client.on_user_orders(user_address, move |update| {
            lock(&metrics).record_order(&owner);
            info!(
                user_address = %owner,
                order_id = %update.order_id,
                status = ?update.status,
                filled_size = %update.filled_size,
                "order update"
            );
        })?;
        self.subscriptions.push(orders);

        let metrics = Arc::clone(&self.metrics);
        let enhancer = self.client.enhancer().clone();
        let owner = user.clone();
        let balances = self.client.on_user_balances(user_address, move |update| {
            lock(&metrics).record_balance(&owner);
            match enhancer.enhance_balance_update(&update) {
                Ok(balance) => info!(
                    user_address = %owner,
                    token = %update.token_ticker,
                    available = %balance.available_display,
                    locked = %balance.locked_display,
                    "balance update"
                ),
                Err(err) => warn!(
                    user_address = %owner,
                    token = %update.token_ticker,
                    available_atoms = %update.available,
                    error = %err,
                    "balance update without display values"
                ),
            }
        })?;
        self.subscriptions.push(balances);

        let metrics = Arc::clone(&self.metrics);
        let owner = user;
        let fills = self.client.on_user_trades(user_address, move |trade| {
            lock(&metrics).record_fill(&owner);
            info!(
                user_address = %owner,
                market_id = %trade.market_id,
                price = %trade.price_display,
                size = %trade.size_display,
                "fill"
            );
        })?;
        self.subscriptions.push(fills);
        Ok(())
    }

    /// Stream until `shutdown` fires, then unsubscribe and close the client
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        let registered = self.subscribe_all()?;
        info!(
            streams = registered,
            markets = self.config.markets.len(),
            users = self.config.users.len(),
            "stream subscriptions registered"
        );

        self.client.connect().context("start websocket")?;
        let mut state_rx = self.client.websocket()?.subscribe_connection_state();

        let workers = shutdown.child_token();
        let warmer = spawn_cache_warmer(
            Arc::clone(&self.client),
            Duration::from_secs(self.config.connection.cache_retry_secs),
            workers.clone(),
        );

        let summary_every = Duration::from_secs(self.config.connection.summary_interval_secs);
        let mut summary = tokio::time::interval(summary_every);
        summary.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = summary.tick() => log_summary(&self.metrics()),
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = state_rx.borrow_and_update().clone();
                    info!(state = ?state, "connection state changed");
                }
            }
        }

        workers.cancel();
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        self.client.close().await;
        if let Err(err) = warmer.await {
            warn!(error = %err, "cache warmer task failed");
        }
        log_summary(&self.metrics());
        info!("stream runner stopped");
        Ok(())
    }
}

fn spawn_cache_warmer(
    client: Arc<ExchangeClient>,
    retry: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<bool> {
    tokio::spawn(async move { warm_cache(&client, retry, &shutdown).await })
}

/// Load reference data, retrying every `retry` until it succeeds or `shutdown` fires.
/// Returns whether the cache is ready.
pub async fn warm_cache(
    client: &ExchangeClient,
    retry: Duration,
    shutdown: &CancellationToken,
) -> bool {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return false,
            result = client.initialize_cache() => result,
        };

        match result {
            Ok(()) => {
                let stats = client.cache().stats();
                info!(
                    attempt,
                    markets = stats.markets,
                    tokens = stats.tokens,
                    "reference cache ready"
                );
                return true;
            }
            Err(err) => warn!(
                attempt,
                error = %err,
                retry_in_ms = retry.as_millis() as u64,
                "reference cache load failed"
            ),
        }

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return false,
            _ = tokio::time::sleep(retry) => {}
        }
    }
}

fn log_summary(snapshot: &StreamMetricsSnapshot) {
    for (market_id, market) in &snapshot.markets {
        info!(
            market_id = %market_id,
            trades = market.trades,
            orderbooks = market.orderbooks,
            last_price = ?market.last_price,
            best_bid = ?market.best_bid,
            best_ask = ?market.best_ask,
            "market summary"
        );
    }
    for (user_address, user) in &snapshot.users {
        info!(
            user_address = %user_address,
            orders = user.orders,
            balances = user.balances,
            fills = user.fills,
            "user summary"
        );
    }
}

fn lock(metrics: &Mutex<StreamMetrics>) -> MutexGuard<'_, StreamMetrics> {
    metrics.lock().unwrap_or_else(PoisonError::into_inner)
}
