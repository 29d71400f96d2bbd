use async_trait::async_trait;
use std::sync::Arc;

use crate::core::SimTime;
use crate::derive::{local_occupancy, OccupancySnapshot};
use crate::error::Result;
use crate::timeline::TimelineModel;
use super::StateSource;

/// Occupancy rebuilt from the loaded stage schedules, with no server
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStateSource;

#[async_trait]
impl StateSource for LocalStateSource {
    async fn state_at(&self, model: Arc<TimelineModel>, time: SimTime) -> Result<OccupancySnapshot> {
        Ok(local_occupancy(&model, time))
    }
}
