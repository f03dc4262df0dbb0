//! Live update channel.
//!
//! - `transport`: SSE connections (`Transport`, `HttpTransport`)
//! - `timer`: cancellable fixed-delay reconnect timer
//! - `channel`: connection loop, reconnect policy and consumer handle

pub mod channel;
pub mod timer;
pub mod transport;

pub use channel::{
    ChannelEvent, ChannelHandle, ChannelOptions, ChannelState, DEFAULT_RECONNECT_DELAY,
    LiveChannel,
};
pub use timer::ReconnectTimer;
pub use transport::{FrameStream, HttpTransport, SseFrame, Transport};
