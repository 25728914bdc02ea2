/*
[INPUT]:  YAML configuration file + EXCHANGE_STREAM__* environment overrides
[OUTPUT]: Validated stream configuration and the SDK config derived from it
[POS]:    Configuration layer - stream setup
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use exchange_sdk::{ClientConfig, ExchangeConfig};

/// Prefix for environment overrides, e.g. `EXCHANGE_STREAM__REST_URL`
pub const ENV_PREFIX: &str = "EXCHANGE_STREAM";

/// Top-level configuration for the streaming runner
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StreamConfig {
    /// REST base url, e.g. `http://localhost:3000`
    pub rest_url: String,
    /// WebSocket url; derived from `rest_url` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
    /// Markets whose trades (and order books) are streamed
    #[serde(default)]
    pub markets: Vec<String>,
    /// Wallet addresses whose orders, balances and fills are streamed
    #[serde(default)]
    pub users: Vec<String>,
    /// Also stream order book snapshots for every market
    #[serde(default = "default_true")]
    pub orderbook: bool,
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Write logs to this file instead of stdout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

/// Timing knobs for the HTTP and WebSocket clients
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_reconnect_delays_ms")]
    pub reconnect_delays_ms: Vec<u64>,
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    #[serde(default = "default_pong_timeout_secs")]
    pub pong_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Delay between reference data load attempts
    #[serde(default = "default_cache_retry_secs")]
    pub cache_retry_secs: u64,
    /// Interval of the per-market summary log line
    #[serde(default = "default_summary_interval_secs")]
    pub summary_interval_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_delays_ms: default_reconnect_delays_ms(),
            ping_interval_secs: default_ping_interval_secs(),
            pong_timeout_secs: default_pong_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            cache_retry_secs: default_cache_retry_secs(),
            summary_interval_secs: default_summary_interval_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_reconnect_delays_ms() -> Vec<u64> {
    vec![1_000, 2_000, 4_000, 8_000, 16_000]
}

fn default_ping_interval_secs() -> u64 {
    30
}

fn default_pong_timeout_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_cache_retry_secs() -> u64 {
    5
}

fn default_summary_interval_secs() -> u64 {
    60
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            rest_url: "http://localhost:3000".to_string(),
            ws_url: None,
            markets: vec!["BTC/USDC".to_string()],
            users: Vec::new(),
            orderbook: true,
            connection: ConnectionConfig::default(),
            log_file: None,
        }
    }
}

impl StreamConfig {
    /// Load from a YAML file, layered with process environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(path.as_ref(), None)
    }

    /// Load with an explicit environment map instead of the process environment
    pub fn from_file_with_env(
        path: impl AsRef<Path>,
        env: config::Map<String, String>,
    ) -> Result<Self> {
        Self::load(path.as_ref(), Some(env))
    }

    fn load(path: &Path, env: Option<config::Map<String, String>>) -> Result<Self> {
        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("markets")
            .with_list_parse_key("users")
            .with_list_parse_key("connection.reconnect_delays_ms")
            .source(env);

        let settings = config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml).required(true))
            .add_source(environment)
            .build()
            .with_context(|| format!("read config {}", path.display()))?;

        let config: Self = settings
            .try_deserialize()
            .with_context(|| format!("parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.markets.is_empty() && self.users.is_empty() {
            bail!("nothing to stream: configure at least one market or user");
        }
        if let Some(blank) = self.markets.iter().find(|m| m.trim().is_empty()) {
            bail!("invalid market id {blank:?}");
        }
        if let Some(blank) = self.users.iter().find(|u| u.trim().is_empty()) {
            bail!("invalid user address {blank:?}");
        }
        if self.connection.cache_retry_secs == 0 {
            bail!("connection.cache_retry_secs must be positive");
        }
        if self.connection.summary_interval_secs == 0 {
            bail!("connection.summary_interval_secs must be positive");
        }

        let exchange = self.exchange_config()?;
        exchange
            .ws_config()
            .and_then(|ws| ws.validate())
            .context("invalid websocket settings")?;
        Ok(())
    }

    /// SDK configuration for these settings
    pub fn exchange_config(&self) -> Result<ExchangeConfig> {
        // rejects anything but http(s) base urls
        exchange_sdk::derive_ws_url(&self.rest_url)
            .with_context(|| format!("invalid rest_url {}", self.rest_url))?;

        let connection = &self.connection;
        let mut exchange = ExchangeConfig::new(self.rest_url.clone());
        exchange.ws_url = self.ws_url.clone();
        exchange.http = ClientConfig {
            timeout: Duration::from_secs(connection.request_timeout_secs),
            connect_timeout: Duration::from_secs(connection.connect_timeout_secs),
        };
        exchange.reconnect_delays = connection
            .reconnect_delays_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect();
        exchange.ping_interval = Duration::from_secs(connection.ping_interval_secs);
        exchange.pong_timeout = Duration::from_secs(connection.pong_timeout_secs);
        Ok(exchange)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("serialize config to YAML")
    }
}
