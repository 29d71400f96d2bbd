use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::{SimTime, StationStatus, VehicleStatus};
use crate::timeline::StatusCounts;

/// Materialized state of every entity at one query time
///
/// Snapshots are values. A newer one replaces an older one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub time: SimTime,
    pub vehicles: BTreeMap<String, VehicleStatus>,
    pub batches: BTreeMap<String, BatchProgress>,
    /// Totals over every vehicle in the schedule
    pub fleet: BatchProgress,
    pub stations: BTreeMap<String, StationSnapshot>,
}

impl Snapshot {
    pub fn vehicle_status(&self, vehicle_id: &str) -> Option<VehicleStatus> {
        self.vehicles.get(vehicle_id).copied()
    }
}

/// Completion counts for a set of vehicles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub in_progress: usize,
    pub waiting: usize,
    pub total: usize,
    /// Completed share rounded half-up; 0 for an empty set
    pub percent: u8,
}

impl From<StatusCounts> for BatchProgress {
    fn from(counts: StatusCounts) -> Self {
        let total = counts.total();
        let percent = if total == 0 {
            0
        } else {
            ((counts.completed * 200 + total) / (2 * total)) as u8
        };
        Self {
            completed: counts.completed,
            in_progress: counts.in_progress,
            waiting: counts.waiting,
            total,
            percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationSnapshot {
    pub name: String,
    pub status: StationStatus,
    pub current_batch: Option<String>,
    pub stages: Vec<StageSnapshot>,
}

impl StationSnapshot {
    pub fn busy_workstations(&self) -> usize {
        self.stages
            .iter()
            .flat_map(|s| s.workstations.iter())
            .filter(|ws| ws.busy)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSnapshot {
    pub stage_number: u32,
    pub stage_name: String,
    pub workstations: Vec<WorkstationSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkstationSnapshot {
    pub workstation_id: String,
    pub ws_number: u32,
    pub occupant: Option<String>,
    pub busy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(completed: usize, in_progress: usize, waiting: usize) -> StatusCounts {
        StatusCounts {
            completed,
            in_progress,
            waiting,
        }
    }

    #[test]
    fn test_percent_empty_is_zero() {
        assert_eq!(BatchProgress::from(counts(0, 0, 0)).percent, 0);
    }

    #[test]
    fn test_percent_rounds_half_up() {
        assert_eq!(BatchProgress::from(counts(2, 1, 1)).percent, 50);
        assert_eq!(BatchProgress::from(counts(1, 0, 2)).percent, 33);
        assert_eq!(BatchProgress::from(counts(2, 0, 1)).percent, 67);
        assert_eq!(BatchProgress::from(counts(1, 0, 7)).percent, 13); // 12.5
        assert_eq!(BatchProgress::from(counts(3, 0, 0)).percent, 100);
    }
}
