use std::sync::Arc;

use crate::core::{ScheduleResult, ScheduleSummary, SimTime};
use crate::derive::OccupancySnapshot;
use crate::error::Result;
use crate::sync::{ChannelEvent, Command};
use crate::timeline::TimelineModel;

/// Every way the store's state can change
#[derive(Debug)]
pub enum Action {
    Play,
    Pause,
    Reset,
    Seek(SimTime),
    /// Move the cursor locally while dragging; no command, no derivation
    Scrub(SimTime),
    ChangeSpeed(u32),
    /// Advance to the next multiplier in the speed set
    CycleSpeed,
    LoadSchedule { order_file: String },
    ScheduleLoaded { seq: u64, outcome: Result<LoadedSchedule> },
    Channel(ChannelEvent),
    Derived { seq: u64, time: SimTime, outcome: Result<OccupancySnapshot> },
}

/// Both halves of a successful schedule load
#[derive(Debug, Clone)]
pub struct LoadedSchedule {
    pub summary: ScheduleSummary,
    pub result: ScheduleResult,
}

/// An outstanding request for occupancy at a time
#[derive(Debug, Clone)]
pub struct DerivationRequest {
    /// Only the highest issued sequence number is ever applied
    pub seq: u64,
    pub time: SimTime,
    pub model: Arc<TimelineModel>,
}

/// Work the store asks its runtime to carry out
#[derive(Debug, Clone)]
pub enum Effect {
    Send(Command),
    Fetch(DerivationRequest),
    Load { seq: u64, order_file: String },
}
