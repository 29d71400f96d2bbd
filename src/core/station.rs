use serde::{Deserialize, Serialize};

/// A maintenance station: an ordered line of stages
///
/// This is static topology only. Which vehicle sits in which workstation
/// lives in a snapshot, never here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub station_name: String,
    /// Batch the scheduler last assigned to the station
    #[serde(default)]
    pub current_batch: Option<String>,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

impl Station {
    /// Get a stage by its number
    pub fn stage(&self, stage_number: u32) -> Option<&Stage> {
        self.stages.iter().find(|s| s.stage_number == stage_number)
    }

    /// Iterate over every workstation across all stages, in line order
    pub fn workstations(&self) -> impl Iterator<Item = &Workstation> {
        self.stages.iter().flat_map(|s| s.workstations.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub stage_number: u32,
    pub stage_name: String,
    #[serde(default)]
    pub workstations: Vec<Workstation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workstation {
    pub workstation_id: String,
    #[serde(default)]
    pub ws_number: u32,
}

/// Station status in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationStatus {
    #[default]
    Idle,
    Setup,
    Running,
}

impl StationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationStatus::Idle => "idle",
            StationStatus::Setup => "setup",
            StationStatus::Running => "running",
        }
    }
}

/// Workstation status as pushed by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkstationStatus {
    #[default]
    Idle,
    Busy,
}
