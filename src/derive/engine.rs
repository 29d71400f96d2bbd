use std::collections::BTreeMap;

use crate::core::{SimTime, StationStatus, Vehicle, VehicleStatus, WorkstationStatus};
use crate::timeline::{StatusCounts, TimelineModel};
use super::occupancy::OccupancySnapshot;
use super::snapshot::{BatchProgress, Snapshot, StageSnapshot, StationSnapshot, WorkstationSnapshot};

/// Classify a vehicle at `time`
///
/// A vehicle without a start is waiting even if it carries a finish. With a
/// start, it is completed once `finish <= time`, in progress once
/// `start <= time`, and waiting before that.
pub fn classify(vehicle: &Vehicle, time: SimTime) -> VehicleStatus {
    let Some(start) = vehicle.start_time else {
        return VehicleStatus::Waiting;
    };
    match vehicle.finish_time {
        Some(finish) if finish <= time => VehicleStatus::Completed,
        _ if start <= time => VehicleStatus::InProgress,
        _ => VehicleStatus::Waiting,
    }
}

fn tally<'a>(vehicles: impl IntoIterator<Item = &'a Vehicle>, time: SimTime) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for v in vehicles {
        match classify(v, time) {
            VehicleStatus::Completed => counts.completed += 1,
            VehicleStatus::InProgress => counts.in_progress += 1,
            VehicleStatus::Waiting => counts.waiting += 1,
        }
    }
    counts
}

/// Progress of one batch's member vehicles at `time`
pub fn batch_progress(model: &TimelineModel, batch_id: &str, time: SimTime) -> BatchProgress {
    tally(model.vehicles_of(batch_id), time).into()
}

/// Progress across every vehicle at `time`
pub fn fleet_progress(model: &TimelineModel, time: SimTime) -> BatchProgress {
    model.time_index().counts_at(time).into()
}

/// Derive the full snapshot at `time`
///
/// Vehicle, batch and fleet figures come from the model alone. Workstation
/// assignment comes from `occupancy` when given; without it every station
/// is shown idle on its static topology.
pub fn derive_snapshot(
    model: &TimelineModel,
    time: SimTime,
    occupancy: Option<&OccupancySnapshot>,
) -> Snapshot {
    let vehicles = model
        .vehicles()
        .iter()
        .map(|v| (v.vehicle_id.clone(), classify(v, time)))
        .collect();

    let batches = model
        .batches()
        .iter()
        .map(|b| (b.batch_id.clone(), batch_progress(model, &b.batch_id, time)))
        .collect();

    let stations = match occupancy {
        Some(occ) => stations_from_occupancy(model, occ),
        None => idle_stations(model),
    };

    Snapshot {
        time,
        vehicles,
        batches,
        fleet: fleet_progress(model, time),
        stations,
    }
}

fn stations_from_occupancy(
    model: &TimelineModel,
    occ: &OccupancySnapshot,
) -> BTreeMap<String, StationSnapshot> {
    occ.stations
        .iter()
        .map(|(key, station)| {
            let stages: Vec<StageSnapshot> = station
                .stages
                .iter()
                .map(|stage| StageSnapshot {
                    stage_number: stage.stage_number,
                    stage_name: stage.stage_name.clone(),
                    workstations: stage
                        .workstations
                        .iter()
                        .map(|ws| WorkstationSnapshot {
                            workstation_id: ws.workstation_id.clone(),
                            ws_number: ws.ws_number,
                            occupant: ws.current_vehicle.clone(),
                            busy: ws.status == WorkstationStatus::Busy && ws.current_vehicle.is_some(),
                        })
                        .collect(),
                })
                .collect();

            let occupied = stages
                .iter()
                .any(|s| s.workstations.iter().any(|ws| ws.busy));
            let status = match station.status {
                StationStatus::Setup => StationStatus::Setup,
                _ if occupied => StationStatus::Running,
                _ => StationStatus::Idle,
            };
            let current_batch = station.current_batch.clone().or_else(|| {
                model
                    .station_topology(key)
                    .and_then(|s| s.current_batch.clone())
            });

            (
                key.clone(),
                StationSnapshot {
                    name: station.name.clone(),
                    status,
                    current_batch,
                    stages,
                },
            )
        })
        .collect()
}

fn idle_stations(model: &TimelineModel) -> BTreeMap<String, StationSnapshot> {
    model
        .stations()
        .iter()
        .map(|station| {
            let stages = station
                .stages
                .iter()
                .map(|stage| StageSnapshot {
                    stage_number: stage.stage_number,
                    stage_name: stage.stage_name.clone(),
                    workstations: stage
                        .workstations
                        .iter()
                        .map(|ws| WorkstationSnapshot {
                            workstation_id: ws.workstation_id.clone(),
                            ws_number: ws.ws_number,
                            occupant: None,
                            busy: false,
                        })
                        .collect(),
                })
                .collect();
            (
                station.station_name.clone(),
                StationSnapshot {
                    name: station.station_name.clone(),
                    status: StationStatus::Idle,
                    current_batch: station.current_batch.clone(),
                    stages,
                },
            )
        })
        .collect()
}
