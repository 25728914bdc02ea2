/*
[INPUT]:  YAML files on disk and explicit environment maps
[OUTPUT]: Verification of config loading, overrides and validation
[POS]:    Integration test layer - configuration
[UPDATE]: When StreamConfig schema or override rules change
*/

use std::io::Write;

use exchange_stream::StreamConfig;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

fn write_yaml(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("temp file");
    file.write_all(contents.as_bytes()).expect("write yaml");
    file
}

#[test]
fn test_minimal_file_gets_defaults() {
    let file = write_yaml("rest_url: https://api.example.test\nmarkets: [BTC/USDC]\n");
    let config = assert_ok!(StreamConfig::from_file_with_env(file.path(), config::Map::new()));

    assert_eq!(config.markets, vec!["BTC/USDC".to_string()]);
    assert!(config.users.is_empty());
    assert!(config.orderbook);
    assert_eq!(config.connection.ping_interval_secs, 30);
    assert_eq!(config.connection.pong_timeout_secs, 60);

    let exchange = assert_ok!(config.exchange_config());
    let ws = assert_ok!(exchange.ws_config());
    assert_eq!(ws.url, "wss://api.example.test/ws");
}

#[test]
fn test_environment_overrides_file() {
    let file = write_yaml("rest_url: http://localhost:3000\nmarkets: [BTC/USDC]\n");
    let mut env = config::Map::new();
    env.insert(
        "EXCHANGE_STREAM__REST_URL".to_string(),
        "https://prod.example.test".to_string(),
    );
    env.insert(
        "EXCHANGE_STREAM__MARKETS".to_string(),
        "BTC/USDC,ETH/USDC".to_string(),
    );
    env.insert(
        "EXCHANGE_STREAM__CONNECTION__PING_INTERVAL_SECS".to_string(),
        "15".to_string(),
    );
    env.insert("UNRELATED__REST_URL".to_string(), "ignored".to_string());

    let config = assert_ok!(StreamConfig::from_file_with_env(file.path(), env));
    assert_eq!(config.rest_url, "https://prod.example.test");
    assert_eq!(
        config.markets,
        vec!["BTC/USDC".to_string(), "ETH/USDC".to_string()]
    );
    assert_eq!(config.connection.ping_interval_secs, 15);
}

#[test]
fn test_invalid_files_are_rejected() {
    let no_targets = write_yaml("rest_url: http://localhost:3000\n");
    assert_err!(StreamConfig::from_file_with_env(no_targets.path(), config::Map::new()));

    let bad_scheme = write_yaml("rest_url: ftp://localhost\nmarkets: [BTC/USDC]\n");
    assert_err!(StreamConfig::from_file_with_env(bad_scheme.path(), config::Map::new()));

    let bad_timing = write_yaml(concat!(
        "rest_url: http://localhost:3000\n",
        "markets: [BTC/USDC]\n",
        "connection:\n",
        "  ping_interval_secs: 30\n",
        "  pong_timeout_secs: 5\n",
    ));
    assert_err!(StreamConfig::from_file_with_env(bad_timing.path(), config::Map::new()));

    assert_err!(StreamConfig::from_file_with_env(
        "/nonexistent/stream.yaml",
        config::Map::new()
    ));
}

#[test]
fn test_shipped_config_loads() {
    let path = format!("{}/config/stream.yaml", env!("CARGO_MANIFEST_DIR"));
    let config = assert_ok!(StreamConfig::from_file_with_env(&path, config::Map::new()));
    assert_eq!(config.markets.len(), 2);
    assert_eq!(config.users.len(), 1);
}
