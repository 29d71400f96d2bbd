use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::message::{Command, Inbound, StateUpdate};
use super::transport::{ChannelStatus, ControlTransport};

/// Outbound frames waiting for the pump
const OUTBOUND_CAPACITY: usize = 64;

/// Something that happened on the control channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    Update(StateUpdate),
    /// Non-fatal; playback falls back to seek-only
    Errored(String),
    Closed,
}

type Handler = Box<dyn FnMut(ChannelEvent) + Send>;

/// Routes inbound frames to the single registered handler
///
/// Only `state_update` frames reach the handler. Unknown types and
/// malformed frames are dropped here.
#[derive(Default)]
pub struct InboundRouter {
    handler: Option<Handler>,
}

impl InboundRouter {
    /// Register the handler, replacing any previous one
    pub fn on_message(&mut self, handler: impl FnMut(ChannelEvent) + Send + 'static) {
        self.handler = Some(Box::new(handler));
    }

    /// Decode a frame and forward it if it is a tick
    pub fn route_text(&mut self, text: &str) {
        match Inbound::parse(text) {
            Some(Inbound::StateUpdate(update)) => self.emit(ChannelEvent::Update(update)),
            Some(Inbound::Other) => trace!("Ignoring inbound frame of unknown type"),
            None => {}
        }
    }

    pub fn emit(&mut self, event: ChannelEvent) {
        match self.handler.as_mut() {
            Some(handler) => handler(event),
            None => trace!("No handler registered, dropping {:?}", event),
        }
    }
}

/// Bridges the playback store and a control transport
///
/// A background pump owns the transport: it connects, forwards inbound
/// frames through the [`InboundRouter`], and writes queued outbound frames.
/// Sending while the channel is not open is a silent no-op. Once closed the
/// adapter is spent; a new one must be created to reconnect.
pub struct SyncAdapter {
    name: String,
    status: Arc<Mutex<ChannelStatus>>,
    transport: Option<Box<dyn ControlTransport>>,
    router: InboundRouter,
    outbound: Option<mpsc::Sender<String>>,
    task: Option<JoinHandle<()>>,
}

impl SyncAdapter {
    pub fn new(transport: Box<dyn ControlTransport>) -> Self {
        Self {
            name: transport.name().to_string(),
            status: Arc::new(Mutex::new(ChannelStatus::Closed)),
            transport: Some(transport),
            router: InboundRouter::default(),
            outbound: None,
            task: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register the single inbound handler; must precede [`start`](Self::start)
    pub fn on_message(&mut self, handler: impl FnMut(ChannelEvent) + Send + 'static) {
        self.router.on_message(handler);
    }

    /// Get current channel status
    pub fn status(&self) -> ChannelStatus {
        self.status.lock().map(|s| *s).unwrap_or(ChannelStatus::Error)
    }

    /// Spawn the pump task; a second call does nothing
    pub fn start(&mut self) {
        let Some(transport) = self.transport.take() else {
            debug!("Adapter {} already started", self.name);
            return;
        };
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        self.outbound = Some(tx);

        let router = std::mem::take(&mut self.router);
        let status = self.status.clone();
        set_status(&status, ChannelStatus::Connecting);
        self.task = Some(tokio::spawn(pump(transport, router, rx, status)));
    }

    /// Queue a command; dropped unless the channel is open
    pub fn send(&self, command: &Command) {
        if !self.status().is_open() {
            debug!("Channel {} not open, dropping {:?}", self.name, command);
            return;
        }
        let Some(outbound) = &self.outbound else {
            return;
        };
        let text = match serde_json::to_string(command) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode {:?}: {}", command, e);
                return;
            }
        };
        if let Err(e) = outbound.try_send(text) {
            warn!("Dropping {:?} on {}: {}", command, self.name, e);
        }
    }

    /// Stop the pump; it closes the transport and reports `Closed`
    pub fn close(&mut self) {
        self.outbound = None;
    }

    /// Wait for the pump to finish after [`close`](Self::close) or hang-up
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

fn set_status(status: &Mutex<ChannelStatus>, value: ChannelStatus) {
    if let Ok(mut s) = status.lock() {
        *s = value;
    }
}

async fn pump(
    mut transport: Box<dyn ControlTransport>,
    mut router: InboundRouter,
    mut outbound: mpsc::Receiver<String>,
    status: Arc<Mutex<ChannelStatus>>,
) {
    let name = transport.name().to_string();

    if let Err(e) = transport.connect().await {
        warn!("Control channel {} unavailable, seek-only playback: {}", name, e);
        set_status(&status, ChannelStatus::Error);
        router.emit(ChannelEvent::Errored(e.to_string()));
        return;
    }
    set_status(&status, ChannelStatus::Open);
    info!("Control channel {} open", name);
    router.emit(ChannelEvent::Opened);

    loop {
        tokio::select! {
            frame = transport.receive_text() => match frame {
                Ok(Some(text)) => router.route_text(&text),
                Ok(None) => {
                    info!("Control channel {} closed by peer", name);
                    break;
                }
                Err(e) => {
                    warn!("Control channel {} receive error: {}", name, e);
                    set_status(&status, ChannelStatus::Error);
                    router.emit(ChannelEvent::Errored(e.to_string()));
                    break;
                }
            },
            text = outbound.recv() => match text {
                Some(text) => {
                    if let Err(e) = transport.send_text(&text).await {
                        warn!("Control channel {} send error: {}", name, e);
                        set_status(&status, ChannelStatus::Error);
                        router.emit(ChannelEvent::Errored(e.to_string()));
                        break;
                    }
                }
                None => {
                    debug!("Adapter for {} closed locally", name);
                    break;
                }
            },
        }
    }

    let _ = transport.close().await;
    set_status(&status, ChannelStatus::Closed);
    router.emit(ChannelEvent::Closed);
}
