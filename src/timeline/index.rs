//! Sorted interval bounds for answering fleet-wide counts in O(log n)

use serde::Serialize;

use crate::core::{SimTime, Vehicle};

/// Vehicle counts by status at one time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub completed: usize,
    pub in_progress: usize,
    pub waiting: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.completed + self.in_progress + self.waiting
    }
}

/// Index over vehicle start/finish bounds
///
/// Vehicles without a start are always waiting and only count toward the
/// total. For the rest, `done` holds `max(start, finish)` so a malformed
/// `finish < start` interval is still counted consistently with
/// [`crate::derive::classify`].
#[derive(Debug, Clone, Default)]
pub struct TimeIndex {
    starts: Vec<SimTime>,
    finishes: Vec<SimTime>,
    done: Vec<SimTime>,
    total: usize,
}

impl TimeIndex {
    pub fn build<'a>(vehicles: impl IntoIterator<Item = &'a Vehicle>) -> Self {
        let mut index = Self::default();
        for v in vehicles {
            index.total += 1;
            let Some(start) = v.start_time else { continue };
            index.starts.push(start);
            if let Some(finish) = v.finish_time {
                index.finishes.push(finish);
                index.done.push(start.max(finish));
            }
        }
        index.starts.sort_unstable();
        index.finishes.sort_unstable();
        index.done.sort_unstable();
        index
    }

    /// Counts at `time`
    pub fn counts_at(&self, time: SimTime) -> StatusCounts {
        let at_or_before = |v: &[SimTime]| v.partition_point(|&x| x <= time);

        let completed = at_or_before(&self.finishes);
        let in_progress = at_or_before(&self.starts) - at_or_before(&self.done);
        StatusCounts {
            completed,
            in_progress,
            waiting: self.total - completed - in_progress,
        }
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::classify;
    use crate::core::VehicleStatus;
    use crate::timeline::model::fixtures::vehicle;

    #[test]
    fn test_counts_match_linear_classification() {
        let vehicles = vec![
            vehicle("a", "b", Some(5), Some(15)),
            vehicle("b", "b", Some(0), None),
            vehicle("c", "b", None, None),
            vehicle("d", "b", None, Some(12)),
            vehicle("e", "b", Some(20), Some(10)),
            vehicle("f", "b", Some(15), Some(15)),
        ];
        let index = TimeIndex::build(&vehicles);
        assert_eq!(index.len(), 6);

        for t in 0..30 {
            let mut expected = StatusCounts::default();
            for v in &vehicles {
                match classify(v, t) {
                    VehicleStatus::Completed => expected.completed += 1,
                    VehicleStatus::InProgress => expected.in_progress += 1,
                    VehicleStatus::Waiting => expected.waiting += 1,
                }
            }
            assert_eq!(index.counts_at(t), expected, "t={}", t);
        }
    }

    #[test]
    fn test_empty_index() {
        let index = TimeIndex::build(&Vec::<Vehicle>::new());
        assert!(index.is_empty());
        assert_eq!(index.counts_at(100), StatusCounts::default());
    }
}
