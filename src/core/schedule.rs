use serde::{Deserialize, Serialize};

use super::{Batch, SimTime, Station, Vehicle};

/// One vehicle's occupancy of one workstation for one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSchedule {
    #[serde(default)]
    pub schedule_id: String,
    pub vehicle_id: String,
    pub batch_id: String,
    pub station_name: String,
    pub stage_number: u32,
    pub workstation_id: String,
    pub start_time: SimTime,
    pub finish_time: SimTime,
}

impl StageSchedule {
    /// Half-open occupancy: `start <= t < finish`
    pub fn occupies(&self, time: SimTime) -> bool {
        self.start_time <= time && time < self.finish_time
    }
}

/// Body of `GET /api/result`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleResult {
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub schedules: Vec<StageSchedule>,
    #[serde(default)]
    pub stations: Vec<Station>,
}

/// Body of `POST /api/schedule`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub total_batches: u32,
    pub total_vehicles: u32,
    #[serde(default)]
    pub total_time: SimTime,
}
