/*
[INPUT]:  WebSocket URL and outbound text frames
[OUTPUT]: Connected sessions yielding inbound text frames
[POS]:    WebSocket layer - wire transport seam (tokio-tungstenite or test doubles)
[UPDATE]: When changing TLS/connect options or frame handling
*/

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Wire-level failures. All of them are transient for the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("connection closed")]
    Closed,
}

/// Opens sessions to a WebSocket endpoint
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Box<dyn Session>, TransportError>;
}

/// One live connection.
///
/// `recv` must be cancel-safe: it is polled inside `tokio::select!`.
#[async_trait]
pub trait Session: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text frame; `Closed` once the peer is gone
    async fn recv(&mut self) -> Result<String, TransportError>;

    /// Close the connection. Calling it twice is harmless.
    async fn close(&mut self);
}

/// Production transport over tokio-tungstenite
#[derive(Debug, Clone)]
pub struct TungsteniteTransport {
    connect_timeout: Duration,
}

impl TungsteniteTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TungsteniteTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn Session>, TransportError> {
        let (stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| {
                TransportError::Connect(format!(
                    "timed out after {}s",
                    self.connect_timeout.as_secs()
                ))
            })?
            .map_err(|err| TransportError::Connect(err.to_string()))?;

        Ok(Box::new(TungsteniteSession {
            stream,
            closed: false,
        }))
    }
}

struct TungsteniteSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl Session for TungsteniteSession {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|err| TransportError::Send(err.to_string()))
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Ok(text),
                    Err(_) => tracing::debug!(len = bytes.len(), "dropping non-utf8 binary frame"),
                },
                // Control frames are answered by tungstenite itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "peer closed websocket");
                    return Err(TransportError::Closed);
                }
                Some(Err(err)) => {
                    tracing::debug!(error = %err, "websocket read failed");
                    return Err(TransportError::Closed);
                }
                None => return Err(TransportError::Closed),
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self.stream.close(None).await {
            tracing::debug!(error = %err, "websocket close returned error");
        }
    }
}
