use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};

use super::transport::{ChannelResult, ControlTransport};

/// Path of the simulation control socket on the scheduling service
const SIMULATION_PATH: &str = "/ws/simulation";

/// Control socket URL for a scheduling service base URL
///
/// `http` becomes `ws` and `https` becomes `wss`.
pub fn simulation_url(api_base_url: &str) -> String {
    let base = api_base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https") {
        format!("wss{}", rest)
    } else if let Some(rest) = base.strip_prefix("http") {
        format!("ws{}", rest)
    } else {
        base.to_string()
    };
    format!("{}{}", base, SIMULATION_PATH)
}

/// Control channel over a WebSocket, one JSON message per text frame
pub struct WebSocketTransport {
    url: String,
    socket: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl WebSocketTransport {
    pub fn new(url: &str) -> Self {
        debug!("Creating WebSocketTransport for {}", url);
        Self {
            url: url.to_string(),
            socket: None,
        }
    }
}

#[async_trait]
impl ControlTransport for WebSocketTransport {
    fn name(&self) -> &str {
        &self.url
    }

    async fn connect(&mut self) -> ChannelResult<()> {
        let (socket, _response) = connect_async(self.url.as_str()).await?;
        self.socket = Some(socket);
        info!("Control socket connected to {}", self.url);
        Ok(())
    }

    async fn close(&mut self) -> ChannelResult<()> {
        if let Some(mut socket) = self.socket.take() {
            // peer may already be gone
            let _ = socket.close(None).await;
        }
        Ok(())
    }

    async fn send_text(&mut self, text: &str) -> ChannelResult<()> {
        let socket = self.socket.as_mut().ok_or("Not connected")?;
        socket.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    async fn receive_text(&mut self) -> ChannelResult<Option<String>> {
        let socket = self.socket.as_mut().ok_or("Not connected")?;
        while let Some(message) = socket.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(Some(text)),
                    Err(e) => trace!("Skipping non-UTF-8 binary frame from {}: {}", self.url, e),
                },
                Message::Close(_) => return Ok(None),
                // pings are answered by the socket itself
                _ => {}
            }
        }
        Ok(None)
    }
}
