/*
[INPUT]:  WsConfig, a Transport, subscribe/unsubscribe intents and outbound frames
[OUTPUT]: A self-healing stream session that dispatches server messages to handlers
[POS]:    WebSocket layer - connection lifecycle (connect, replay, flush, keepalive, backoff)
[UPDATE]: When changing reconnect/replay ordering or shutdown semantics
*/

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::backoff::BackoffPolicy;
use super::config::WsConfig;
use super::dispatcher::{Handler, HandlerRegistry, Registration};
use super::liveness::{Liveness, LivenessMonitor};
use super::message::{ClientMessage, MessageKind, ServerMessage, Subscription};
use super::queue::OutboundQueue;
use super::registry::{Acquire, Release, SubscriptionRegistry};
use super::transport::{Session, Transport, TransportError, TungsteniteTransport};
use crate::cache::ReferenceCache;
use crate::enhancement::Enhancer;
use crate::http::{ExchangeError, Result};

const MALFORMED_LOG_LIMIT: usize = 20;
const RAW_LOG_MAX_BYTES: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting out a backoff delay (or not started yet)
    Disconnected { attempt: usize },
    Connecting { attempt: usize },
    /// Subscriptions replayed and queue flushed
    Connected,
    Closed,
}

#[derive(Debug)]
enum Outbound {
    /// Subscribe/unsubscribe/ping. Dropped on disconnect; replay rebuilds them.
    Control(ClientMessage),
    /// Caller frame. Requeued on disconnect.
    User(String),
}

#[derive(Debug, Default)]
struct CoreState {
    registry: SubscriptionRegistry,
    queue: OutboundQueue,
    /// True only between "replay + flush done" and the next disconnect
    live: bool,
    closed: bool,
}

/// State shared by the client handle, the worker and stream subscriptions
#[derive(Debug)]
pub(super) struct Shared {
    config: WsConfig,
    state: Mutex<CoreState>,
    pub(super) handlers: Arc<HandlerRegistry>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    connection: watch::Sender<ConnectionState>,
    /// Messages dropped because reference data was not loaded yet
    pub(super) skipped_not_ready: Arc<AtomicU64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: ConnectionState) {
        self.connection.send_replace(state);
    }

    pub(super) fn subscribe(&self, sub: &Subscription) {
        let mut state = self.lock();
        match state.registry.acquire(sub) {
            Acquire::First => {
                debug!(subscription = %sub, "subscription added");
                if state.live {
                    let _ = self
                        .outbound_tx
                        .send(Outbound::Control(ClientMessage::Subscribe(sub.clone())));
                }
            }
            Acquire::Shared { count } => {
                debug!(subscription = %sub, count, "subscription reference added");
            }
        }
    }

    pub(super) fn unsubscribe(&self, sub: &Subscription) {
        let mut state = self.lock();
        match state.registry.release(sub) {
            Release::Unknown => {
                warn!(subscription = %sub, "unsubscribe for unknown subscription ignored");
            }
            Release::Last => {
                debug!(subscription = %sub, "subscription removed");
                if state.live {
                    let _ = self
                        .outbound_tx
                        .send(Outbound::Control(ClientMessage::Unsubscribe(sub.clone())));
                }
            }
            Release::Shared { count } => {
                debug!(subscription = %sub, count, "subscription reference released");
            }
        }
    }

    fn send_frame(&self, frame: String) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(ExchangeError::Transport(TransportError::Closed));
        }
        if state.live {
            if let Err(mpsc::error::SendError(Outbound::User(frame))) =
                self.outbound_tx.send(Outbound::User(frame))
            {
                state.queue.enqueue(frame);
            }
        } else {
            state.queue.enqueue(frame);
            debug!(queued = state.queue.len(), "frame queued until connected");
        }
        Ok(())
    }
}

/// WebSocket client with reference-counted subscriptions, an offline send queue,
/// ping/pong liveness and bounded reconnect backoff.
///
/// Nothing happens on construction; call [`WebSocketClient::start`].
pub struct WebSocketClient {
    pub(super) shared: Arc<Shared>,
    pub(super) enhancer: Enhancer,
    transport: Arc<dyn Transport>,
    backoff: BackoffPolicy,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Outbound>>>,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for WebSocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketClient")
            .field("url", &self.shared.config.url)
            .field("state", &*self.shared.connection.borrow())
            .finish_non_exhaustive()
    }
}

impl WebSocketClient {
    pub fn new(config: WsConfig, cache: Arc<ReferenceCache>) -> Result<Self> {
        let transport = Arc::new(TungsteniteTransport::new(config.connect_timeout));
        Self::with_transport(config, cache, transport)
    }

    /// Build a client over a custom transport
    pub fn with_transport(
        config: WsConfig,
        cache: Arc<ReferenceCache>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        let backoff = config.backoff()?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (connection, _rx) = watch::channel(ConnectionState::Disconnected { attempt: 0 });

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(CoreState::default()),
                handlers: HandlerRegistry::new(),
                outbound_tx,
                connection,
                skipped_not_ready: Arc::new(AtomicU64::new(0)),
            }),
            enhancer: Enhancer::new(cache),
            transport,
            backoff,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            shutdown: CancellationToken::new(),
            worker: Mutex::new(None),
        })
    }

    /// Spawn the connection worker on the current Tokio runtime
    pub fn start(&self) -> Result<()> {
        if self.shared.lock().closed {
            return Err(ExchangeError::Config("websocket client is closed".to_string()));
        }

        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            return Err(ExchangeError::Config(
                "websocket client already started".to_string(),
            ));
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            ExchangeError::Config("websocket client requires a Tokio runtime".to_string())
        })?;

        let outbound_rx = self
            .outbound_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| ExchangeError::Config("outbound channel already taken".to_string()))?;

        let task = StreamWorker {
            shared: Arc::clone(&self.shared),
            transport: Arc::clone(&self.transport),
            backoff: self.backoff.clone(),
            outbound_rx,
            shutdown: self.shutdown.clone(),
            malformed: MalformedLog::default(),
        };
        *worker = Some(runtime.spawn(task.run()));
        Ok(())
    }

    /// Add a reference to `sub`; the subscribe frame goes out on the first one
    pub fn subscribe(&self, sub: Subscription) {
        self.shared.subscribe(&sub);
    }

    /// Drop a reference to `sub`; the unsubscribe frame goes out on the last one
    pub fn unsubscribe(&self, sub: &Subscription) {
        self.shared.unsubscribe(sub);
    }

    /// Send an arbitrary JSON frame, queued while disconnected
    pub fn send_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let frame = serde_json::to_string(value)?;
        self.shared.send_frame(frame)
    }

    /// Register a raw handler for one message kind
    pub fn on(&self, kind: MessageKind, handler: Handler) -> Registration {
        self.shared.handlers.register(kind, handler)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.connection.borrow().clone()
    }

    pub fn subscribe_connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.connection.subscribe()
    }

    /// True while a session is up with subscriptions replayed and the queue flushed
    pub fn is_ready(&self) -> bool {
        self.shared.lock().live
    }

    pub fn subscription_count(&self, sub: &Subscription) -> usize {
        self.shared.lock().registry.count(sub)
    }

    pub fn active_subscriptions(&self) -> Vec<Subscription> {
        self.shared.lock().registry.active().cloned().collect()
    }

    /// Stream messages dropped because the reference cache was not ready
    pub fn skipped_before_ready(&self) -> u64 {
        self.shared.skipped_not_ready.load(Ordering::Relaxed)
    }

    pub fn queued_frames(&self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn cache(&self) -> &Arc<ReferenceCache> {
        self.enhancer.cache()
    }

    /// Stop the worker, close the session and wait for both
    pub async fn close(&self) {
        self.shutdown.cancel();
        {
            let mut state = self.shared.lock();
            state.closed = true;
            state.live = false;
        }

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!(error = %err, "websocket worker terminated abnormally");
            }
        }
        self.shared.publish(ConnectionState::Closed);
    }
}

impl Drop for WebSocketClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[derive(Debug)]
enum StreamExit {
    Shutdown,
    /// Session lost; carries a caller frame that was taken but not sent
    Disconnected { unsent: Option<String> },
}

struct StreamWorker {
    shared: Arc<Shared>,
    transport: Arc<dyn Transport>,
    backoff: BackoffPolicy,
    outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    shutdown: CancellationToken,
    malformed: MalformedLog,
}

impl StreamWorker {
    async fn run(mut self) {
        let url = self.shared.config.url.clone();
        let mut attempt: usize = 0;

        'run: loop {
            if self.shutdown.is_cancelled() {
                break 'run;
            }

            self.shared.publish(ConnectionState::Connecting { attempt });
            info!(%url, attempt, "connecting websocket");

            let connected = tokio::select! {
                _ = self.shutdown.cancelled() => break 'run,
                result = self.transport.connect(&url) => result,
            };

            match connected {
                Ok(mut session) => {
                    let online = tokio::select! {
                        _ = self.shutdown.cancelled() => {
                            session.close().await;
                            break 'run;
                        }
                        result = self.bring_online(session.as_mut()) => result,
                    };

                    match online {
                        Ok(replayed) => {
                            attempt = 0;
                            self.shared.publish(ConnectionState::Connected);
                            info!(%url, subscriptions = replayed, "websocket ready");

                            match self.stream_loop(session.as_mut()).await {
                                StreamExit::Shutdown => {
                                    session.close().await;
                                    break 'run;
                                }
                                StreamExit::Disconnected { unsent } => self.go_offline(unsent),
                            }
                        }
                        Err(err) => {
                            warn!(%url, error = %err, "websocket session failed during replay");
                            self.go_offline(None);
                        }
                    }
                    session.close().await;
                }
                Err(err) => {
                    warn!(%url, attempt, error = %err, "websocket connect failed");
                }
            }

            let delay = self.backoff.delay_for(attempt);
            self.shared.publish(ConnectionState::Disconnected { attempt });
            info!(attempt, ?delay, "websocket reconnect scheduled");

            tokio::select! {
                _ = self.shutdown.cancelled() => break 'run,
                _ = tokio::time::sleep(delay) => {}
            }
            attempt = attempt.saturating_add(1);
        }

        self.go_offline(None);
        self.shared.publish(ConnectionState::Closed);
        debug!("websocket worker stopped");
    }

    /// Replay subscriptions then flush queued frames until both are settled,
    /// then mark the session live in the same critical section.
    async fn bring_online(
        &self,
        session: &mut dyn Session,
    ) -> std::result::Result<usize, TransportError> {
        let mut replayed: BTreeSet<Subscription> = BTreeSet::new();

        loop {
            let (to_subscribe, to_unsubscribe, batch) = {
                let mut state = self.shared.lock();
                let desired: BTreeSet<Subscription> = state.registry.active().cloned().collect();
                let to_subscribe: Vec<Subscription> =
                    desired.difference(&replayed).cloned().collect();
                let to_unsubscribe: Vec<Subscription> =
                    replayed.difference(&desired).cloned().collect();
                let batch = state.queue.take_all();

                if to_subscribe.is_empty() && to_unsubscribe.is_empty() && batch.is_empty() {
                    state.live = true;
                    return Ok(replayed.len());
                }
                (to_subscribe, to_unsubscribe, batch)
            };

            let replay = async {
                for sub in to_unsubscribe {
                    if let Some(frame) = encode(&ClientMessage::Unsubscribe(sub.clone())) {
                        session.send(frame).await?;
                    }
                    replayed.remove(&sub);
                }
                for sub in to_subscribe {
                    if let Some(frame) = encode(&ClientMessage::Subscribe(sub.clone())) {
                        session.send(frame).await?;
                    }
                    debug!(subscription = %sub, "subscription replayed");
                    replayed.insert(sub);
                }
                Ok::<(), TransportError>(())
            };
            if let Err(err) = replay.await {
                self.shared.lock().queue.restore_front(batch);
                return Err(err);
            }

            let mut pending = OutboundQueue::from(batch);
            match pending.flush(session).await {
                Ok(0) => {}
                Ok(sent) => debug!(sent, "queued frames flushed"),
                Err(err) => {
                    self.shared.lock().queue.restore_front(pending.take_all());
                    return Err(err);
                }
            }
        }
    }

    async fn stream_loop(&mut self, session: &mut dyn Session) -> StreamExit {
        let ping_interval = self.shared.config.ping_interval;
        let started = Instant::now();
        let mut liveness = LivenessMonitor::new(self.shared.config.pong_timeout, started);
        let mut ping = tokio::time::interval_at(started + ping_interval, ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("websocket shutdown requested");
                    return StreamExit::Shutdown;
                }
                _ = ping.tick() => {
                    match liveness.check(Instant::now()) {
                        Liveness::Expired { silent_for } => {
                            warn!(?silent_for, "no pong within timeout; dropping session");
                            return StreamExit::Disconnected { unsent: None };
                        }
                        Liveness::SendPing => {
                            let Some(frame) = encode(&ClientMessage::Ping) else { continue };
                            if let Err(err) = session.send(frame).await {
                                warn!(error = %err, "ping send failed");
                                return StreamExit::Disconnected { unsent: None };
                            }
                        }
                    }
                }
                outbound = self.outbound_rx.recv() => {
                    match outbound {
                        Some(Outbound::Control(message)) => {
                            let Some(frame) = encode(&message) else { continue };
                            if let Err(err) = session.send(frame).await {
                                warn!(error = %err, "control frame send failed");
                                return StreamExit::Disconnected { unsent: None };
                            }
                        }
                        Some(Outbound::User(frame)) => {
                            if let Err(err) = session.send(frame.clone()).await {
                                warn!(error = %err, "frame send failed; requeueing");
                                return StreamExit::Disconnected { unsent: Some(frame) };
                            }
                        }
                        None => return StreamExit::Shutdown,
                    }
                }
                inbound = session.recv() => {
                    match inbound {
                        Ok(text) => self.route(&text, &mut liveness),
                        Err(err) => {
                            warn!(error = %err, "websocket session closed");
                            return StreamExit::Disconnected { unsent: None };
                        }
                    }
                }
            }
        }
    }

    fn route(&mut self, text: &str, liveness: &mut LivenessMonitor) {
        match ServerMessage::parse(text) {
            Ok(ServerMessage::Pong) => liveness.record_pong(Instant::now()),
            Ok(message) => {
                if let ServerMessage::Error { message: reason } = &message {
                    warn!(%reason, "server reported error");
                }
                self.shared.handlers.dispatch(&message);
            }
            Err(err) => self.malformed.log(&err, text),
        }
    }

    /// Leave the live state. Pending caller frames go back to the queue front;
    /// pending control frames are dropped since replay rebuilds them.
    fn go_offline(&mut self, unsent: Option<String>) {
        let mut state = self.shared.lock();
        state.live = false;

        let mut restored: VecDeque<String> = unsent.into_iter().collect();
        let mut dropped_controls = 0usize;
        while let Ok(outbound) = self.outbound_rx.try_recv() {
            match outbound {
                Outbound::User(frame) => restored.push_back(frame),
                Outbound::Control(_) => dropped_controls += 1,
            }
        }
        if !restored.is_empty() {
            debug!(requeued = restored.len(), "frames requeued for next session");
            state.queue.restore_front(restored);
        }
        if dropped_controls > 0 {
            debug!(dropped_controls, "pending control frames superseded by replay");
        }
    }
}

fn encode(message: &ClientMessage) -> Option<String> {
    match message.to_text() {
        Ok(frame) => Some(frame),
        Err(err) => {
            error!(?message, error = %err, "failed to encode client message");
            None
        }
    }
}

/// Malformed-frame log throttle for one worker: warn for the first
/// `MALFORMED_LOG_LIMIT` frames, debug afterwards.
#[derive(Debug, Default)]
struct MalformedLog {
    seen: usize,
}

impl MalformedLog {
    /// Counts the frame and reports whether it should be logged at warn
    fn record(&mut self) -> bool {
        self.seen += 1;
        self.seen <= MALFORMED_LOG_LIMIT
    }

    fn log(&mut self, err: &ExchangeError, raw: &str) {
        let preview = truncate_for_log(raw, RAW_LOG_MAX_BYTES);
        if self.record() {
            warn!(
                error = %err,
                bytes = raw.len(),
                message = %preview,
                "dropping malformed websocket frame"
            );
        } else {
            debug!(
                error = %err,
                bytes = raw.len(),
                message = %preview,
                "dropping malformed websocket frame"
            );
        }
    }
}

fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut cut = max_len;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut out = String::with_capacity(cut + 3);
    out.push_str(&value[..cut]);
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> WebSocketClient {
        WebSocketClient::new(
            WsConfig::new("ws://127.0.0.1:9"),
            Arc::new(ReferenceCache::new()),
        )
        .expect("client")
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("ééé", 3), "é...");
    }

    #[test]
    fn malformed_log_throttle_is_per_worker() {
        let mut first = MalformedLog::default();
        let warned = (0..MALFORMED_LOG_LIMIT + 5).filter(|_| first.record()).count();
        assert_eq!(warned, MALFORMED_LOG_LIMIT);
        assert!(!first.record());

        // a rebuilt client starts with its own budget
        let mut second = MalformedLog::default();
        assert!(second.record());
    }

    #[test]
    fn start_requires_runtime() {
        let client = client();
        assert!(matches!(client.start(), Err(ExchangeError::Config(_))));
    }

    #[test]
    fn frames_queue_while_offline() {
        let client = client();
        client.send_json(&serde_json::json!({"type": "custom"})).expect("queued");
        client.send_json(&serde_json::json!({"type": "custom", "n": 2})).expect("queued");

        assert_eq!(client.queued_frames(), 2);
        assert!(!client.is_ready());
    }

    #[test]
    fn offline_subscriptions_are_only_counted() {
        let client = client();
        let btc = Subscription::trades("BTC/USDC");

        client.subscribe(btc.clone());
        client.subscribe(btc.clone());
        client.unsubscribe(&btc);

        assert_eq!(client.subscription_count(&btc), 1);
        assert_eq!(client.queued_frames(), 0);
        assert_eq!(client.active_subscriptions(), vec![btc]);
    }

    #[tokio::test]
    async fn closed_client_rejects_frames_and_restart() {
        let client = client();
        client.close().await;

        assert_eq!(client.connection_state(), ConnectionState::Closed);
        assert!(matches!(
            client.send_json(&serde_json::json!({})),
            Err(ExchangeError::Transport(TransportError::Closed))
        ));
        assert!(client.start().is_err());
    }
}
