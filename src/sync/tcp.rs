use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, trace};

use super::transport::{ChannelResult, ControlTransport};

/// Control channel carrying one JSON message per line over TCP
pub struct TcpLineTransport {
    addr: String,
    reader: Option<BufReader<OwnedReadHalf>>,
    writer: Option<OwnedWriteHalf>,
    /// Bytes of the line being read; survives a cancelled receive
    pending: Vec<u8>,
}

impl TcpLineTransport {
    pub fn new(addr: &str) -> Self {
        debug!("Creating TcpLineTransport for {}", addr);
        Self {
            addr: addr.to_string(),
            reader: None,
            writer: None,
            pending: Vec::new(),
        }
    }
}

#[async_trait]
impl ControlTransport for TcpLineTransport {
    fn name(&self) -> &str {
        &self.addr
    }

    async fn connect(&mut self) -> ChannelResult<()> {
        let stream = TcpStream::connect(&self.addr).await?;
        stream.set_nodelay(true)?;

        let (read_half, write_half) = stream.into_split();
        self.reader = Some(BufReader::new(read_half));
        self.pending.clear();
        self.writer = Some(write_half);
        info!("Control channel connected to {}", self.addr);
        Ok(())
    }

    async fn close(&mut self) -> ChannelResult<()> {
        self.reader = None;
        if let Some(mut writer) = self.writer.take() {
            // peer may already be gone
            let _ = writer.shutdown().await;
        }
        Ok(())
    }

    async fn send_text(&mut self, text: &str) -> ChannelResult<()> {
        let writer = self.writer.as_mut().ok_or("Not connected")?;
        writer.write_all(text.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn receive_text(&mut self) -> ChannelResult<Option<String>> {
        let reader = self.reader.as_mut().ok_or("Not connected")?;
        loop {
            let n = reader.read_until(b'\n', &mut self.pending).await?;
            if n == 0 && self.pending.is_empty() {
                return Ok(None);
            }

            let mut frame = std::mem::take(&mut self.pending);
            while matches!(frame.last(), Some(b'\n' | b'\r')) {
                frame.pop();
            }
            match String::from_utf8(frame) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => return Ok(Some(line)),
                Err(e) => trace!("Skipping non-UTF-8 frame from {}: {}", self.addr, e),
            }
        }
    }
}
