use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Fixed-delay reconnect timer that stops waiting when the channel is torn
/// down.
///
/// Built on `tokio::time`, so paused-clock tests control elapsed time.
#[derive(Debug, Clone)]
pub struct ReconnectTimer {
    delay: Duration,
    cancel: CancellationToken,
}

impl ReconnectTimer {
    pub fn new(delay: Duration, cancel: CancellationToken) -> Self {
        Self { delay, cancel }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits out the delay. Returns `false` if cancelled first.
    pub async fn wait(&self) -> bool {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(self.delay) => true,
        }
    }
}
