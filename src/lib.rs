//! Playback and progress tracking for a production schedule
//!
//! A computed schedule is loaded once into an immutable [`timeline::TimelineModel`].
//! Every displayed fact (vehicle status, batch progress, station occupancy) is
//! derived from that model and a single point in simulated time. Playback can
//! be driven locally or mirrored from a remote simulator over a control channel.

pub mod api;
pub mod config;
pub mod core;
pub mod derive;
pub mod error;
pub mod export;
pub mod playback;
pub mod session;
pub mod store;
pub mod sync;
pub mod timeline;

pub use error::{Error, Result};
