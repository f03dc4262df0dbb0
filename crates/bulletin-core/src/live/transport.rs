//! Server-push stream transport.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;

/// One server-sent event frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    /// Event name (`message` when the server sent none).
    pub event: String,
    pub data: String,
    pub id: String,
    /// Reconnection hint from a `retry:` field.
    pub retry: Option<Duration>,
}

impl SseFrame {
    /// A default-named frame carrying `data`.
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            event: "message".to_string(),
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            ..Self::default()
        }
    }
}

/// Boxed stream of frames from one connection. Dropping it closes the
/// connection.
pub type FrameStream = BoxStream<'static, Result<SseFrame>>;

/// Opens event streams.
pub trait Transport: Send + Sync + 'static {
    /// Establishes one connection to `endpoint`.
    fn connect(&self, endpoint: &str) -> impl Future<Output = Result<FrameStream>> + Send;
}

/// SSE over HTTP with `reqwest` and `eventsource-stream`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Uses `http` as is, so a client carrying a session cookie stays
    /// authenticated on the stream.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for HttpTransport {
    async fn connect(&self, endpoint: &str) -> Result<FrameStream> {
        let response = self
            .http
            .get(endpoint)
            .header("accept", "text/event-stream")
            .header("cache-control", "no-cache")
            .send()
            .await
            .with_context(|| format!("connect to {endpoint}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("event stream returned HTTP {status}");
        }

        let frames = response.bytes_stream().eventsource().map(|item| {
            item.map(|event| SseFrame {
                event: event.event,
                data: event.data,
                id: event.id,
                retry: event.retry,
            })
            .map_err(|e| anyhow!("SSE stream error: {e}"))
        });
        Ok(frames.boxed())
    }
}
