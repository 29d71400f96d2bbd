pub mod http;
pub mod local;

pub use http::HttpScheduleApi;
pub use local::LocalStateSource;

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::{ScheduleResult, ScheduleSummary, SimTime, Station};
use crate::derive::OccupancySnapshot;
use crate::error::Result;
use crate::timeline::TimelineModel;

/// Request/response interface of the scheduling service
#[async_trait]
pub trait ScheduleApi: Send + Sync {
    /// `POST /api/schedule`: run the scheduler over an order file
    async fn create_schedule(&self, order_file: &str) -> Result<ScheduleSummary>;

    /// `GET /api/result`: the full result of the last run
    async fn fetch_result(&self) -> Result<ScheduleResult>;

    /// `GET /api/stations`: static station list
    async fn stations(&self) -> Result<Vec<Station>>;
}

/// Where workstation occupancy at a time comes from
///
/// `model` is the timeline current when the request was issued, so a
/// source that derives locally never mixes two schedules.
#[async_trait]
pub trait StateSource: Send + Sync {
    async fn state_at(&self, model: Arc<TimelineModel>, time: SimTime) -> Result<OccupancySnapshot>;
}
