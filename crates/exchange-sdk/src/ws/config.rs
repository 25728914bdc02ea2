/*
[INPUT]:  Endpoint URL and timing parameters
[OUTPUT]: Validated WebSocket client configuration
[POS]:    WebSocket layer - construction-time settings
[UPDATE]: When adding connection options
*/

use std::time::Duration;

use super::backoff::{BackoffPolicy, DEFAULT_RECONNECT_DELAYS};
use crate::http::{ExchangeError, Result};

pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsConfig {
    pub url: String,
    pub reconnect_delays: Vec<Duration>,
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    pub connect_timeout: Duration,
}

impl WsConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delays: DEFAULT_RECONNECT_DELAYS.to_vec(),
            ping_interval: DEFAULT_PING_INTERVAL,
            pong_timeout: DEFAULT_PONG_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_reconnect_delays(mut self, delays: Vec<Duration>) -> Self {
        self.reconnect_delays = delays;
        self
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_pong_timeout(mut self, timeout: Duration) -> Self {
        self.pong_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ExchangeError::Config(format!(
                "websocket url must use ws:// or wss://, got {}",
                self.url
            )));
        }
        if self.ping_interval.is_zero() {
            return Err(ExchangeError::Config(
                "ping interval must be greater than zero".to_string(),
            ));
        }
        if self.pong_timeout <= self.ping_interval {
            return Err(ExchangeError::Config(format!(
                "pong timeout ({:?}) must be longer than the ping interval ({:?})",
                self.pong_timeout, self.ping_interval
            )));
        }
        self.backoff().map(|_| ())
    }

    pub fn backoff(&self) -> Result<BackoffPolicy> {
        BackoffPolicy::new(self.reconnect_delays.clone())
    }
}
