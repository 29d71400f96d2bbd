use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::SimTime;
use crate::error::Result;
use crate::playback::SpeedSet;
use crate::sync::{simulation_url, ControlTransport, TcpLineTransport, WebSocketTransport};
use crate::timeline::LoadPolicy;

/// Where occupancy snapshots come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateSourceKind {
    /// `GET /api/state/{time}` on the scheduling service
    #[default]
    Remote,
    /// Rebuilt from the loaded stage schedules
    Local,
}

/// How the simulator control channel is carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// `/ws/simulation` on the scheduling service
    #[default]
    WebSocket,
    /// Newline-delimited JSON at `channel_addr`
    Tcp,
}

/// Persistent session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    pub channel: ChannelKind,
    /// `host:port` of the TCP control channel
    pub channel_addr: String,
    pub speeds: SpeedSet,
    /// Timeline length before any schedule is loaded
    pub default_max_time: SimTime,
    pub strict_intervals: bool,
    pub state_source: StateSourceKind,
    pub request_timeout_secs: u64,
    pub order_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            channel: ChannelKind::WebSocket,
            channel_addr: "127.0.0.1:8001".to_string(),
            speeds: SpeedSet::default(),
            default_max_time: 2000,
            strict_intervals: false,
            state_source: StateSourceKind::Remote,
            request_timeout_secs: 10,
            order_file: "test_orders_001.json".to_string(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("shop-timeline").join("settings.json"))
    }

    /// Load from the user config dir, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from `path`; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            debug!("No settings at {:?}, using defaults", path);
            return Self::default();
        }
        let parsed = fs::read_to_string(path)
            .map_err(crate::error::Error::from)
            .and_then(|contents| Ok(serde_json::from_str(&contents)?));
        match parsed {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring unreadable settings {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        match Self::config_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load_policy(&self) -> LoadPolicy {
        LoadPolicy {
            strict_intervals: self.strict_intervals,
        }
    }

    /// A fresh, unconnected control transport
    pub fn control_transport(&self) -> Box<dyn ControlTransport> {
        match self.channel {
            ChannelKind::WebSocket => Box::new(WebSocketTransport::new(&simulation_url(&self.api_base_url))),
            ChannelKind::Tcp => Box::new(TcpLineTransport::new(&self.channel_addr)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
