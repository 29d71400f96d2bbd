pub mod message;
pub mod transport;
pub mod mock;
pub mod tcp;
pub mod ws;
pub mod adapter;

pub use message::{Command, Inbound, StateUpdate};
pub use transport::{ChannelResult, ChannelStatus, ControlTransport};
pub use mock::{MockPeer, MockTransport};
pub use tcp::TcpLineTransport;
pub use ws::{simulation_url, WebSocketTransport};
pub use adapter::{ChannelEvent, InboundRouter, SyncAdapter};
