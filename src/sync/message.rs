use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::SimTime;

/// Outbound control command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Play,
    Pause,
    Reset,
    Seek { time: SimTime },
    Speed { value: u32 },
    SetMaxTime { value: SimTime },
}

/// A tick confirmed by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub time: SimTime,
    #[serde(default)]
    pub is_playing: Option<bool>,
    #[serde(default)]
    pub speed: Option<u32>,
}

/// Inbound push message
///
/// Any type other than `state_update` decodes to `Other` and is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    StateUpdate(StateUpdate),
    #[serde(other)]
    Other,
}

impl Inbound {
    /// Decode one frame; malformed frames yield `None`
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str(text) {
            Ok(msg) => Some(msg),
            Err(e) => {
                trace!("Ignoring malformed inbound frame: {}", e);
                None
            }
        }
    }
}
