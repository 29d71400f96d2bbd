//! Pure derivation of system state at a query time
//!
//! Nothing in here reads a clock: the same model, time and pushed occupancy
//! always produce the same snapshot.

pub mod engine;
pub mod occupancy;
pub mod snapshot;

pub use engine::{batch_progress, classify, derive_snapshot, fleet_progress};
pub use occupancy::{local_occupancy, OccupancySnapshot, StageOccupancy, StationOccupancy, WorkstationOccupancy};
pub use snapshot::{BatchProgress, Snapshot, StageSnapshot, StationSnapshot, WorkstationSnapshot};
