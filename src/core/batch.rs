use serde::{Deserialize, Serialize};

/// Batch priority as assigned on the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

/// A batch of identical vehicles handled together at one station
///
/// Member vehicles are not carried on the wire; the timeline indexes them
/// by `batch_id` at load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,
    #[serde(default)]
    pub priority: Priority,
    pub system: String,
    pub manufacturer: String,
    pub model: String,
    pub quantity: u32,
}
