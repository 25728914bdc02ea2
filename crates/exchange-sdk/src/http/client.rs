/*
[INPUT]:  HTTP configuration (base URL, timeouts)
[OUTPUT]: Configured reqwest client ready for API calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::http::{ExchangeError, Result};
use crate::types::ErrorResponse;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// REST client for the exchange API
#[derive(Debug, Clone)]
pub struct ExchangeHttpClient {
    http_client: Client,
    base_url: Url,
    timeout: Duration,
}

impl ExchangeHttpClient {
    /// Create a new client with default configuration
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(ClientConfig::default(), base_url)
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig, base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: Url::parse(base_url)?,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    /// Send a request and decode the JSON body, mapping non-2xx to `ExchangeError::Api`
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T> {
        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                ExchangeError::Timeout {
                    duration: self.timeout.as_secs(),
                }
            } else {
                ExchangeError::Http(err)
            }
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|parsed| parsed.error)
                .unwrap_or_else(|_| body.clone());
            tracing::warn!(status = %status, message = %message, "exchange API returned error");
            return Err(ExchangeError::api_error(status, message));
        }

        Ok(serde_json::from_str(&body)?)
    }

    pub(crate) async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, endpoint)?.json(body);
        self.send_json(builder).await
    }

    /// GET /api/health
    pub async fn health(&self) -> Result<serde_json::Value> {
        let builder = self.request(Method::GET, "/api/health")?;
        self.send_json(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_health_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"status":"ok"}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = ExchangeHttpClient::new(&server.uri()).expect("client init");
        let body = client.health().await.expect("health failed");

        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_error_body_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(503).set_body_raw(
                r#"{"error":"database unavailable"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = ExchangeHttpClient::new(&server.uri()).expect("client init");
        let err = client.health().await.expect_err("should fail");

        match err {
            ExchangeError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "database unavailable");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = ExchangeHttpClient::new("not a url").expect_err("should fail");
        assert!(matches!(err, ExchangeError::UrlParse(_)));
    }
}
