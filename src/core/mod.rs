pub mod vehicle;
pub mod batch;
pub mod station;
pub mod schedule;

pub use vehicle::{Vehicle, VehicleStatus};
pub use batch::{Batch, Priority};
pub use station::{Stage, Station, StationStatus, Workstation, WorkstationStatus};
pub use schedule::{ScheduleResult, ScheduleSummary, StageSchedule};

/// Simulation time in whole minutes from the start of the schedule
pub type SimTime = u32;

/// Format minutes as `H:MM`
pub fn format_time(minutes: SimTime) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}
