use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::{ScheduleResult, ScheduleSummary, SimTime, Station};
use crate::derive::OccupancySnapshot;
use crate::error::{Error, Result};
use crate::timeline::TimelineModel;
use super::{ScheduleApi, StateSource};

#[derive(Serialize)]
struct ScheduleRequest<'a> {
    order_file: &'a str,
}

/// HTTP client for the scheduling service
#[derive(Clone)]
pub struct HttpScheduleApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpScheduleApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NoSchedule);
        }
        Ok(response.error_for_status()?.json().await?)
    }
}

#[async_trait]
impl ScheduleApi for HttpScheduleApi {
    async fn create_schedule(&self, order_file: &str) -> Result<ScheduleSummary> {
        let url = self.url("/api/schedule");
        debug!("POST {} order_file={}", url, order_file);
        let summary = self
            .client
            .post(&url)
            .json(&ScheduleRequest { order_file })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(summary)
    }

    async fn fetch_result(&self) -> Result<ScheduleResult> {
        self.get("/api/result").await
    }

    async fn stations(&self) -> Result<Vec<Station>> {
        self.get("/api/stations").await
    }
}

#[async_trait]
impl StateSource for HttpScheduleApi {
    async fn state_at(&self, _model: Arc<TimelineModel>, time: SimTime) -> Result<OccupancySnapshot> {
        self.get(&format!("/api/state/{}", time)).await
    }
}
