//! Live update channel: one long-lived stream with a fixed-delay reconnect
//! loop.
//!
//! State machine: `Connecting -> Open -> (Error -> Connecting)` repeating
//! without bound; `Closed` is terminal and only reached through teardown
//! (`ChannelHandle::close`, dropping the handle).

use std::fmt;
use std::time::Duration;

use anyhow::{Error, anyhow};
use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::timer::ReconnectTimer;
use super::transport::{SseFrame, Transport};
use crate::model::StreamEvent;
use crate::router;

/// Default delay between a stream error and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

const DEFAULT_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    /// Connection attempt in progress (1-based count since open).
    Connecting { attempt: u64 },
    Open,
    /// The last connection failed; a reconnect is scheduled.
    Error { message: String },
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Connecting { attempt } => write!(f, "connecting (attempt {attempt})"),
            ChannelState::Open => write!(f, "open"),
            ChannelState::Error { message } => write!(f, "error: {message}"),
            ChannelState::Closed => write!(f, "closed"),
        }
    }
}

/// Messages delivered to the channel consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Event(StreamEvent),
    /// A frame whose payload could not be decoded.
    Malformed { data: String, error: String },
}

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    pub reconnect_delay: Duration,
    /// Capacity of the consumer queue.
    pub buffer: usize,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            buffer: DEFAULT_BUFFER,
        }
    }
}

/// Consumer side of an open channel. Dropping it tears the channel down.
pub struct ChannelHandle {
    events: mpsc::Receiver<ChannelEvent>,
    state: watch::Receiver<ChannelState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    /// Next delivered message; `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }

    pub fn state(&self) -> ChannelState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }

    /// Closes the connection and stops reconnecting.
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!("live channel task join error: {e}");
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub struct LiveChannel;

impl LiveChannel {
    /// Spawns the connection loop for `endpoint` on the current runtime.
    pub fn open<T: Transport>(
        transport: T,
        endpoint: impl Into<String>,
        options: ChannelOptions,
    ) -> ChannelHandle {
        let endpoint = endpoint.into();
        let (events_tx, events_rx) = mpsc::channel(options.buffer.max(1));
        let (state_tx, state_rx) = watch::channel(ChannelState::Connecting { attempt: 1 });
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(
            transport,
            endpoint,
            options.reconnect_delay,
            events_tx,
            state_tx,
            cancel.clone(),
        ));

        ChannelHandle {
            events: events_rx,
            state: state_rx,
            cancel,
            task: Some(task),
        }
    }
}

enum PumpEnd {
    Failed(Error),
    ConsumerGone,
}

async fn run<T: Transport>(
    transport: T,
    endpoint: String,
    delay: Duration,
    events: mpsc::Sender<ChannelEvent>,
    state: watch::Sender<ChannelState>,
    cancel: CancellationToken,
) {
    let timer = ReconnectTimer::new(delay, cancel.clone());
    let mut attempt: u64 = 0;
    info!(%endpoint, "opening live channel");

    loop {
        attempt += 1;
        state.send_replace(ChannelState::Connecting { attempt });

        let end = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            end = pump(&transport, &endpoint, &events, &state) => end,
        };

        match end {
            PumpEnd::ConsumerGone => {
                debug!("live channel consumer dropped");
                break;
            }
            PumpEnd::Failed(err) => {
                warn!(%endpoint, attempt, "live channel error: {err:#}");
                state.send_replace(ChannelState::Error {
                    message: format!("{err:#}"),
                });
                info!(delay_ms = timer.delay().as_millis(), "scheduling reconnect");
                if !timer.wait().await {
                    break;
                }
            }
        }
    }

    state.send_replace(ChannelState::Closed);
    info!(%endpoint, "live channel closed");
}

/// Runs one connection until it fails or the consumer goes away.
async fn pump<T: Transport>(
    transport: &T,
    endpoint: &str,
    events: &mpsc::Sender<ChannelEvent>,
    state: &watch::Sender<ChannelState>,
) -> PumpEnd {
    let mut frames = match transport.connect(endpoint).await {
        Ok(frames) => frames,
        Err(err) => return PumpEnd::Failed(err),
    };
    state.send_replace(ChannelState::Open);
    debug!(%endpoint, "live channel open");

    while let Some(item) = frames.next().await {
        let frame = match item {
            Ok(frame) => frame,
            Err(err) => return PumpEnd::Failed(err),
        };
        let Some(message) = classify(frame) else {
            continue;
        };
        if events.send(message).await.is_err() {
            return PumpEnd::ConsumerGone;
        }
    }

    PumpEnd::Failed(anyhow!("event stream ended"))
}

/// Turns a frame into a consumer message, skipping keepalives and empty
/// frames.
fn classify(frame: SseFrame) -> Option<ChannelEvent> {
    if let Some(retry) = frame.retry {
        debug!(
            retry_ms = retry.as_millis(),
            "server retry hint ignored; reconnect delay is fixed"
        );
    }
    if frame.data.trim().is_empty() {
        return None;
    }
    match frame.event.as_str() {
        "" | "message" | "newsletter" => {}
        "ping" => return None,
        other => {
            debug!(event = other, "skipping unknown stream event");
            return None;
        }
    }

    match router::decode(&frame.data) {
        Ok(event) => Some(ChannelEvent::Event(event)),
        Err(err) => {
            error!(data = %frame.data, "malformed stream message: {err:#}");
            Some(ChannelEvent::Malformed {
                data: frame.data,
                error: format!("{err:#}"),
            })
        }
    }
}
