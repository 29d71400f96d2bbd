use async_trait::async_trait;
use std::error::Error;

/// Result type for control transport operations
pub type ChannelResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Status of a control channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelStatus {
    #[default]
    Closed,
    Connecting,
    Open,
    Error,
}

impl ChannelStatus {
    pub fn is_open(&self) -> bool {
        *self == ChannelStatus::Open
    }
}

/// Trait for the streaming control channel to the simulator
///
/// Frames are whole JSON text messages. Implementations:
/// - WebSocket text frames
/// - newline-delimited JSON over TCP
/// - in-memory mock for tests and offline sessions
#[async_trait]
pub trait ControlTransport: Send {
    /// Get the name/address of this channel
    fn name(&self) -> &str;

    /// Open the channel; no handshake follows
    async fn connect(&mut self) -> ChannelResult<()>;

    /// Close the channel
    async fn close(&mut self) -> ChannelResult<()>;

    /// Send one frame
    async fn send_text(&mut self, text: &str) -> ChannelResult<()>;

    /// Wait for the next frame; `None` once the peer has closed
    ///
    /// Must be cancel safe: it is raced against outbound sends.
    async fn receive_text(&mut self) -> ChannelResult<Option<String>>;
}
