use thiserror::Error;

/// Errors produced by the timeline core and its transports
#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("vehicle {vehicle_id} has a malformed interval")]
    MalformedInterval { vehicle_id: String },

    #[error("speed {0}x is not in the configured speed set")]
    UnknownSpeed(u32),

    #[error("no schedule has been created yet")]
    NoSchedule,
}

pub type Result<T> = std::result::Result<T, Error>;
