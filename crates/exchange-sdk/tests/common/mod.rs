/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for exchange-sdk tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use exchange_sdk::ws::{Session, Transport, TransportError};
use exchange_sdk::{ConnectionState, Market, ReferenceSet, Token, WebSocketClient};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use wiremock::MockServer;

/// Long enough for paused-clock tests to reach the ping deadlines
pub const RECV_TIMEOUT: Duration = Duration::from_secs(120);

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn token(ticker: &str, decimals: u32) -> Token {
    Token {
        ticker: ticker.to_string(),
        decimals,
        name: ticker.to_string(),
    }
}

pub fn market(base: &str, quote: &str) -> Market {
    Market {
        id: format!("{base}/{quote}"),
        base_ticker: base.to_string(),
        quote_ticker: quote.to_string(),
        tick_size: "1000000".to_string(),
        lot_size: "1000".to_string(),
        min_size: "1000".to_string(),
        maker_fee_bps: 10,
        taker_fee_bps: 20,
    }
}

pub fn btc_usdc_reference() -> ReferenceSet {
    ReferenceSet {
        markets: vec![market("BTC", "USDC")],
        tokens: vec![token("BTC", 8), token("USDC", 6)],
    }
}

pub fn markets_body() -> Value {
    json!({
        "type": "all_markets",
        "markets": [{
            "id": "BTC/USDC",
            "base_ticker": "BTC",
            "quote_ticker": "USDC",
            "tick_size": "1000000",
            "lot_size": "1000",
            "min_size": "1000",
            "maker_fee_bps": 10,
            "taker_fee_bps": 20
        }]
    })
}

pub fn tokens_body() -> Value {
    json!({
        "type": "all_tokens",
        "tokens": [
            { "ticker": "BTC", "decimals": 8, "name": "Bitcoin" },
            { "ticker": "USDC", "decimals": 6, "name": "USD Coin" }
        ]
    })
}

/// Trade frame as pushed by the server; price 110000.5 USDC, size 0.5 BTC
pub fn trade_frame(market_id: &str, buyer: &str, seller: &str) -> Value {
    json!({
        "type": "trade",
        "trade": {
            "id": "t-1",
            "market_id": market_id,
            "buyer_address": buyer,
            "seller_address": seller,
            "buyer_order_id": "b-1",
            "seller_order_id": "s-1",
            "price": "110000500000",
            "size": "50000000",
            "side": "buy",
            "timestamp": 1704067200
        }
    })
}

pub fn subscribe_frame(
    channel: &str,
    market_id: Option<&str>,
    user_address: Option<&str>,
) -> Value {
    json!({
        "type": "subscribe",
        "channel": channel,
        "market_id": market_id,
        "user_address": user_address
    })
}

pub fn unsubscribe_frame(
    channel: &str,
    market_id: Option<&str>,
    user_address: Option<&str>,
) -> Value {
    json!({
        "type": "unsubscribe",
        "channel": channel,
        "market_id": market_id,
        "user_address": user_address
    })
}

/// Server side of one in-memory session
#[derive(Debug)]
pub struct MockPeer {
    sent: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<String>,
    fail_sends: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl MockPeer {
    /// Next frame the client sent, parsed. `None` once the session is gone.
    pub async fn next_sent(&mut self) -> Option<Value> {
        let frame = tokio::time::timeout(RECV_TIMEOUT, self.sent.recv())
            .await
            .expect("timed out waiting for client frame")?;
        Some(serde_json::from_str(&frame).expect("client sent invalid json"))
    }

    /// Next frame that is not a ping
    pub async fn next_non_ping(&mut self) -> Option<Value> {
        loop {
            let frame = self.next_sent().await?;
            if frame["type"] != "ping" {
                return Some(frame);
            }
        }
    }

    pub fn push(&self, frame: Value) {
        self.inbound
            .send(frame.to_string())
            .expect("client session already gone");
    }

    pub fn push_raw(&self, text: &str) {
        self.inbound
            .send(text.to_string())
            .expect("client session already gone");
    }

    /// Make every further client send fail
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn client_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockSession {
    sent: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<String>,
    fail_sends: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Session for MockSession {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Send("injected failure".to_string()));
        }
        self.sent
            .send(text)
            .map_err(|_| TransportError::Send("peer gone".to_string()))
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        self.inbound.recv().await.ok_or(TransportError::Closed)
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// In-memory transport; every successful connect hands a [`MockPeer`] to the test
pub struct MockTransport {
    peers_tx: mpsc::UnboundedSender<MockPeer>,
    failures_left: AtomicUsize,
    connects: AtomicUsize,
}

pub struct MockPeers {
    peers: mpsc::UnboundedReceiver<MockPeer>,
}

impl MockPeers {
    pub async fn next(&mut self) -> MockPeer {
        tokio::time::timeout(RECV_TIMEOUT, self.peers.recv())
            .await
            .expect("timed out waiting for connect")
            .expect("transport dropped")
    }

    pub fn try_next(&mut self) -> Option<MockPeer> {
        self.peers.try_recv().ok()
    }
}

impl MockTransport {
    pub fn new() -> (Arc<Self>, MockPeers) {
        let (peers_tx, peers) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            peers_tx,
            failures_left: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
        });
        (transport, MockPeers { peers })
    }

    /// Fail the next `count` connect attempts
    pub fn fail_connects(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn connect_attempts(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Session>, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::Connect("injected connect failure".to_string()));
        }

        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let fail_sends = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));

        let peer = MockPeer {
            sent: sent_rx,
            inbound: inbound_tx,
            fail_sends: Arc::clone(&fail_sends),
            closed: Arc::clone(&closed),
        };
        self.peers_tx
            .send(peer)
            .map_err(|_| TransportError::Connect("test harness gone".to_string()))?;

        Ok(Box::new(MockSession {
            sent: sent_tx,
            inbound: inbound_rx,
            fail_sends,
            closed,
        }))
    }
}

/// Wait until the client publishes a state matching `predicate`
pub async fn wait_for_state<F>(client: &WebSocketClient, predicate: F) -> ConnectionState
where
    F: FnMut(&ConnectionState) -> bool,
{
    let mut rx = client.subscribe_connection_state();
    let state = tokio::time::timeout(RECV_TIMEOUT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for connection state")
        .expect("connection state sender dropped");
    state.clone()
}

pub async fn wait_until_connected(client: &WebSocketClient) {
    wait_for_state(client, |state| *state == ConnectionState::Connected).await;
}

/// Poll `condition` every few milliseconds until it holds
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(RECV_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never became true");
}

/// Shared sink for callback payloads
pub fn collector<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(T) + Send + Sync + 'static) {
    let store = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&store);
    (store, move |item| sink.lock().expect("collector lock").push(item))
}
