use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::transport::{ChannelResult, ControlTransport};

/// In-memory control channel
///
/// The paired [`MockPeer`] plays the simulator: it pushes inbound frames,
/// sees every frame sent, and can hang up.
pub struct MockTransport {
    name: String,
    connected: bool,
    inbound: mpsc::UnboundedReceiver<String>,
    sent: Arc<Mutex<Vec<String>>>,
    refuse_connect: bool,
}

/// Simulator side of a [`MockTransport`]
#[derive(Clone)]
pub struct MockPeer {
    inbound: mpsc::UnboundedSender<String>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    /// Create a connected pair
    pub fn pair(name: &str) -> (Self, MockPeer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                name: name.to_string(),
                connected: false,
                inbound: rx,
                sent: sent.clone(),
                refuse_connect: false,
            },
            MockPeer { inbound: tx, sent },
        )
    }

    /// A transport whose `connect` always fails
    pub fn unreachable(name: &str) -> (Self, MockPeer) {
        let (mut transport, peer) = Self::pair(name);
        transport.refuse_connect = true;
        (transport, peer)
    }
}

impl MockPeer {
    /// Push a frame to the client
    pub fn push(&self, text: impl Into<String>) {
        // receiver gone means the client already hung up
        let _ = self.inbound.send(text.into());
    }

    /// Frames the client has sent so far
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Hang up once queued frames are consumed
    pub fn hang_up(self) {
        drop(self.inbound);
    }
}

#[async_trait]
impl ControlTransport for MockTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&mut self) -> ChannelResult<()> {
        if self.refuse_connect {
            return Err("connection refused".into());
        }
        self.connected = true;
        Ok(())
    }

    async fn close(&mut self) -> ChannelResult<()> {
        self.connected = false;
        self.inbound.close();
        Ok(())
    }

    async fn send_text(&mut self, text: &str) -> ChannelResult<()> {
        if !self.connected {
            return Err("Not connected".into());
        }
        self.sent
            .lock()
            .map_err(|_| "sent log poisoned")?
            .push(text.to_string());
        Ok(())
    }

    async fn receive_text(&mut self) -> ChannelResult<Option<String>> {
        if !self.connected {
            return Err("Not connected".into());
        }
        Ok(self.inbound.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_connect() {
        let (mut transport, _peer) = MockTransport::pair("test");
        assert!(transport.receive_text().await.is_err());

        transport.connect().await.unwrap();
        transport.send_text("{}").await.unwrap();

        transport.close().await.unwrap();
        assert!(transport.send_text("{}").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_transport_send_receive() {
        let (mut transport, peer) = MockTransport::pair("test");
        transport.connect().await.unwrap();

        transport.send_text(r#"{"command":"play"}"#).await.unwrap();
        assert_eq!(peer.sent(), vec![r#"{"command":"play"}"#.to_string()]);

        peer.push(r#"{"type":"state_update","time":10}"#);
        let frame = transport.receive_text().await.unwrap();
        assert_eq!(frame.as_deref(), Some(r#"{"type":"state_update","time":10}"#));

        peer.hang_up();
        assert_eq!(transport.receive_text().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mock_transport_unreachable() {
        let (mut transport, _peer) = MockTransport::unreachable("down");
        assert!(transport.connect().await.is_err());
        assert!(transport.send_text("{}").await.is_err());
    }
}
