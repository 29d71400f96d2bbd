use serde::{Deserialize, Serialize};

use super::SimTime;

/// A single vehicle instance produced by the scheduler
///
/// The interval never changes after load. Only the status derived from it
/// at a query time does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub vehicle_id: String,
    pub batch_id: String,
    pub manufacturer: String,
    pub model: String,
    /// Manufacturer origin category (e.g. Japanese, European)
    pub system: String,
    /// `None` until the vehicle has been scheduled to start
    #[serde(default)]
    pub start_time: Option<SimTime>,
    /// `None` until the vehicle has been scheduled to finish
    #[serde(default)]
    pub finish_time: Option<SimTime>,
}

impl Vehicle {
    /// A finish without a start, or a finish before the start
    pub fn has_malformed_interval(&self) -> bool {
        match (self.start_time, self.finish_time) {
            (None, Some(_)) => true,
            (Some(start), Some(finish)) => finish < start,
            _ => false,
        }
    }
}

/// Per-vehicle status at a query time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Waiting,
    InProgress,
    Completed,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Waiting => "waiting",
            VehicleStatus::InProgress => "in_progress",
            VehicleStatus::Completed => "completed",
        }
    }
}
