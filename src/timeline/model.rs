use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::core::{Batch, ScheduleResult, SimTime, StageSchedule, Station, Vehicle};
use crate::error::{Error, Result};
use super::TimeIndex;

/// How strictly to treat upstream interval defects at load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadPolicy {
    /// Reject the whole load if any vehicle has a malformed interval
    pub strict_intervals: bool,
}

/// Immutable, indexed view of one loaded schedule
///
/// Built once per load. A reload builds a new model and the owner swaps the
/// `Arc` wholesale; nothing here is ever patched.
#[derive(Debug, Clone)]
pub struct TimelineModel {
    batches: Vec<Batch>,
    vehicles: Vec<Vehicle>,
    schedules: Vec<StageSchedule>,
    stations: Vec<Station>,
    batch_index: HashMap<String, usize>,
    vehicle_index: HashMap<String, usize>,
    station_index: HashMap<String, usize>,
    /// batch_id -> indices into `vehicles`, in load order
    members: HashMap<String, Vec<usize>>,
    time_index: TimeIndex,
    max_time: SimTime,
    loaded_at: DateTime<Utc>,
}

impl Default for TimelineModel {
    fn default() -> Self {
        Self::empty()
    }
}

impl TimelineModel {
    /// A model with no schedule loaded
    pub fn empty() -> Self {
        Self {
            batches: Vec::new(),
            vehicles: Vec::new(),
            schedules: Vec::new(),
            stations: Vec::new(),
            batch_index: HashMap::new(),
            vehicle_index: HashMap::new(),
            station_index: HashMap::new(),
            members: HashMap::new(),
            time_index: TimeIndex::default(),
            max_time: 0,
            loaded_at: Utc::now(),
        }
    }

    /// Build the model from a fetched schedule result
    pub fn build(result: ScheduleResult, policy: LoadPolicy) -> Result<Self> {
        let ScheduleResult {
            batches,
            vehicles,
            schedules,
            stations,
        } = result;

        for v in vehicles.iter().filter(|v| v.has_malformed_interval()) {
            if policy.strict_intervals {
                return Err(Error::MalformedInterval {
                    vehicle_id: v.vehicle_id.clone(),
                });
            }
            warn!(
                "Vehicle {} has malformed interval start={:?} finish={:?}",
                v.vehicle_id, v.start_time, v.finish_time
            );
        }

        let batch_index = batches
            .iter()
            .enumerate()
            .map(|(i, b)| (b.batch_id.clone(), i))
            .collect();
        let vehicle_index = vehicles
            .iter()
            .enumerate()
            .map(|(i, v)| (v.vehicle_id.clone(), i))
            .collect();
        let station_index = stations
            .iter()
            .enumerate()
            .map(|(i, s)| (s.station_name.clone(), i))
            .collect();

        let mut members: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, v) in vehicles.iter().enumerate() {
            members.entry(v.batch_id.clone()).or_default().push(i);
        }

        for batch in &batches {
            let count = members.get(&batch.batch_id).map_or(0, Vec::len);
            if count != batch.quantity as usize {
                warn!(
                    "Batch {} declares quantity {} but has {} vehicles",
                    batch.batch_id, batch.quantity, count
                );
            }
        }

        let max_time = vehicles
            .iter()
            .filter_map(|v| v.finish_time)
            .chain(schedules.iter().map(|s| s.finish_time))
            .max()
            .unwrap_or(0);

        let time_index = TimeIndex::build(&vehicles);

        info!(
            "Built timeline: {} batches, {} vehicles, {} stage schedules, {} stations, max time {}",
            batches.len(),
            vehicles.len(),
            schedules.len(),
            stations.len(),
            max_time
        );
        debug!("Time index covers {} vehicles", time_index.len());

        Ok(Self {
            batches,
            vehicles,
            schedules,
            stations,
            batch_index,
            vehicle_index,
            station_index,
            members,
            time_index,
            max_time,
            loaded_at: Utc::now(),
        })
    }

    /// Member vehicles of a batch, in load order
    pub fn vehicles_of<'a>(&'a self, batch_id: &str) -> impl Iterator<Item = &'a Vehicle> + 'a {
        self.members
            .get(batch_id)
            .map(|idx| idx.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&i| &self.vehicles[i])
    }

    /// Look up a batch by id
    pub fn batch_of(&self, batch_id: &str) -> Option<&Batch> {
        self.batch_index.get(batch_id).map(|&i| &self.batches[i])
    }

    /// Static topology of a station
    pub fn station_topology(&self, station_name: &str) -> Option<&Station> {
        self.station_index.get(station_name).map(|&i| &self.stations[i])
    }

    /// Look up a vehicle by id
    pub fn vehicle(&self, vehicle_id: &str) -> Option<&Vehicle> {
        self.vehicle_index.get(vehicle_id).map(|&i| &self.vehicles[i])
    }

    /// Latest finish time across vehicles and stage schedules, or 0
    pub fn max_time(&self) -> SimTime {
        self.max_time
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn schedules(&self) -> &[StageSchedule] {
        &self.schedules
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn time_index(&self) -> &TimeIndex {
        &self.time_index
    }

    /// When this model was built
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty() && self.stations.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_build_indexes_members_and_topology() {
        let model = TimelineModel::build(sample_result(), LoadPolicy::default()).unwrap();

        let members: Vec<_> = model.vehicles_of("B1").map(|v| v.vehicle_id.as_str()).collect();
        assert_eq!(members, ["B1_RAV4_1", "B1_RAV4_2", "B1_RAV4_3", "B1_RAV4_4"]);
        assert_eq!(model.vehicles_of("B2").count(), 0);
        assert_eq!(model.vehicles_of("missing").count(), 0);

        assert_eq!(model.batch_of("B1").unwrap().quantity, 4);
        assert!(model.batch_of("B9").is_none());
        assert_eq!(model.station_topology("North").unwrap().workstations().count(), 3);
        assert!(model.vehicle("B1_RAV4_3").is_some());
    }

    #[test]
    fn test_max_time_includes_schedule_entries() {
        let model = TimelineModel::build(sample_result(), LoadPolicy::default()).unwrap();
        // last stage entry (160) outlasts the latest vehicle finish (150)
        assert_eq!(model.max_time(), 160);
    }

    #[test]
    fn test_max_time_zero_without_finishes() {
        let result = ScheduleResult {
            vehicles: vec![vehicle("a", "B", Some(3), None), vehicle("b", "B", None, None)],
            ..Default::default()
        };
        let model = TimelineModel::build(result, LoadPolicy::default()).unwrap();
        assert_eq!(model.max_time(), 0);
        assert_eq!(TimelineModel::empty().max_time(), 0);
    }

    #[test]
    fn test_malformed_interval_policy() {
        let result = ScheduleResult {
            vehicles: vec![vehicle("bad", "B", None, Some(10))],
            ..Default::default()
        };

        let lenient = TimelineModel::build(result.clone(), LoadPolicy::default());
        assert!(lenient.is_ok());

        let strict = TimelineModel::build(result, LoadPolicy { strict_intervals: true });
        match strict {
            Err(Error::MalformedInterval { vehicle_id }) => assert_eq!(vehicle_id, "bad"),
            other => panic!("expected malformed interval, got {:?}", other.map(|_| ())),
        }
    }
}
