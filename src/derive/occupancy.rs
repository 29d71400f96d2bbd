use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::{SimTime, StationStatus, WorkstationStatus};
use crate::timeline::TimelineModel;

/// Workstation occupancy at one time, as served by `GET /api/state/{time}`
///
/// Which physical workstation a vehicle sits in is an assignment decision of
/// the simulator, so this is accepted as pushed rather than derived from
/// vehicle intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    pub time: SimTime,
    #[serde(default)]
    pub stations: BTreeMap<String, StationOccupancy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationOccupancy {
    pub name: String,
    #[serde(default)]
    pub status: StationStatus,
    #[serde(default)]
    pub current_batch: Option<String>,
    #[serde(default)]
    pub stages: Vec<StageOccupancy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOccupancy {
    pub stage_number: u32,
    #[serde(default)]
    pub stage_name: String,
    #[serde(default)]
    pub workstations: Vec<WorkstationOccupancy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkstationOccupancy {
    pub workstation_id: String,
    #[serde(default)]
    pub ws_number: u32,
    #[serde(default)]
    pub status: WorkstationStatus,
    #[serde(default)]
    pub current_vehicle: Option<String>,
}

/// Rebuild occupancy from the model's stage schedules
///
/// A workstation is busy with a vehicle when one of its schedule entries
/// satisfies `start <= time < finish`; its station then runs that entry's
/// batch. Entries naming an unknown station or workstation are skipped.
pub fn local_occupancy(model: &TimelineModel, time: SimTime) -> OccupancySnapshot {
    let mut stations: BTreeMap<String, StationOccupancy> = model
        .stations()
        .iter()
        .map(|station| {
            let occupancy = StationOccupancy {
                name: station.station_name.clone(),
                status: StationStatus::Idle,
                current_batch: station.current_batch.clone(),
                stages: station
                    .stages
                    .iter()
                    .map(|stage| StageOccupancy {
                        stage_number: stage.stage_number,
                        stage_name: stage.stage_name.clone(),
                        workstations: stage
                            .workstations
                            .iter()
                            .map(|ws| WorkstationOccupancy {
                                workstation_id: ws.workstation_id.clone(),
                                ws_number: ws.ws_number,
                                status: WorkstationStatus::Idle,
                                current_vehicle: None,
                            })
                            .collect(),
                    })
                    .collect(),
            };
            (station.station_name.clone(), occupancy)
        })
        .collect();

    // workstation_id -> (stage index, workstation index), per station
    let slots: HashMap<&str, HashMap<&str, (usize, usize)>> = model
        .stations()
        .iter()
        .map(|station| {
            let mut map = HashMap::new();
            for (si, stage) in station.stages.iter().enumerate() {
                for (wi, ws) in stage.workstations.iter().enumerate() {
                    map.insert(ws.workstation_id.as_str(), (si, wi));
                }
            }
            (station.station_name.as_str(), map)
        })
        .collect();

    for entry in model.schedules().iter().filter(|s| s.occupies(time)) {
        let Some(&(si, wi)) = slots
            .get(entry.station_name.as_str())
            .and_then(|m| m.get(entry.workstation_id.as_str()))
        else {
            continue;
        };
        let Some(station) = stations.get_mut(&entry.station_name) else {
            continue;
        };
        let ws = &mut station.stages[si].workstations[wi];
        ws.status = WorkstationStatus::Busy;
        ws.current_vehicle = Some(entry.vehicle_id.clone());
        station.status = StationStatus::Running;
        station.current_batch = Some(entry.batch_id.clone());
    }

    OccupancySnapshot { time, stations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::model::fixtures::sample_result;
    use crate::timeline::LoadPolicy;

    fn model() -> TimelineModel {
        TimelineModel::build(sample_result(), LoadPolicy::default()).unwrap()
    }

    #[test]
    fn test_local_occupancy_assigns_running_entries() {
        let occ = local_occupancy(&model(), 30);
        let north = &occ.stations["North"];
        assert_eq!(north.status, StationStatus::Running);
        assert_eq!(north.current_batch.as_deref(), Some("B1"));

        let stage1 = &north.stages[0].workstations[0];
        assert_eq!(stage1.status, WorkstationStatus::Busy);
        assert_eq!(stage1.current_vehicle.as_deref(), Some("B1_RAV4_2"));

        let stage2 = &north.stages[1].workstations[0];
        assert_eq!(stage2.current_vehicle.as_deref(), Some("B1_RAV4_1"));
        assert_eq!(north.stages[1].workstations[1].status, WorkstationStatus::Idle);

        assert_eq!(occ.stations["South"].status, StationStatus::Idle);
    }

    #[test]
    fn test_local_occupancy_finish_is_exclusive() {
        let occ = local_occupancy(&model(), 160);
        assert!(occ.stations.values().all(|s| s.status == StationStatus::Idle));
    }

    #[test]
    fn test_server_state_shape() {
        let json = r#"{
            "time": 30,
            "stations": {
                "North": {
                    "name": "North",
                    "status": "setup",
                    "current_batch": "B1",
                    "stages": [{
                        "stage_number": 1,
                        "stage_name": "Exterior",
                        "workstations": [{"workstation_id": "North_1_0", "ws_number": 0, "status": "busy", "current_vehicle": "v1"}]
                    }]
                }
            }
        }"#;
        let occ: OccupancySnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(occ.time, 30);
        assert_eq!(occ.stations["North"].status, StationStatus::Setup);
        assert_eq!(
            occ.stations["North"].stages[0].workstations[0].current_vehicle.as_deref(),
            Some("v1")
        );
    }
}
