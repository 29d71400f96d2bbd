pub mod controller;

pub use controller::{Directive, PlaybackController};

use serde::{Deserialize, Serialize};

use crate::core::SimTime;
use crate::error::{Error, Result};

/// Playback mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    #[default]
    Paused,
    Playing,
}

/// The authoritative notion of "now" on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    /// Always within `0..=max_time`
    pub current_time: SimTime,
    pub max_time: SimTime,
    pub is_playing: bool,
    /// Multiplier from the configured speed set
    pub speed: u32,
}

impl PlaybackState {
    pub fn mode(&self) -> PlaybackMode {
        if self.is_playing {
            PlaybackMode::Playing
        } else {
            PlaybackMode::Paused
        }
    }
}

/// Ordered, finite set of playback multipliers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct SpeedSet(Vec<u32>);

impl Default for SpeedSet {
    fn default() -> Self {
        Self(vec![1, 2, 4])
    }
}

impl TryFrom<Vec<u32>> for SpeedSet {
    type Error = String;

    fn try_from(mut speeds: Vec<u32>) -> std::result::Result<Self, Self::Error> {
        speeds.retain(|&s| s > 0);
        speeds.sort_unstable();
        speeds.dedup();
        if speeds.is_empty() {
            return Err("speed set must contain at least one positive multiplier".to_string());
        }
        Ok(Self(speeds))
    }
}

impl From<SpeedSet> for Vec<u32> {
    fn from(set: SpeedSet) -> Self {
        set.0
    }
}

impl SpeedSet {
    pub fn first(&self) -> u32 {
        self.0[0]
    }

    pub fn contains(&self, speed: u32) -> bool {
        self.0.contains(&speed)
    }

    /// Validate a requested multiplier
    pub fn check(&self, speed: u32) -> Result<u32> {
        if self.contains(speed) {
            Ok(speed)
        } else {
            Err(Error::UnknownSpeed(speed))
        }
    }

    /// The multiplier after `current`, wrapping to the first after the last
    ///
    /// An unknown `current` also yields the first multiplier.
    pub fn next_after(&self, current: u32) -> u32 {
        match self.0.iter().position(|&s| s == current) {
            Some(i) => self.0[(i + 1) % self.0.len()],
            None => self.first(),
        }
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_cycle_wraps() {
        let speeds = SpeedSet::default();
        assert_eq!(speeds.next_after(1), 2);
        assert_eq!(speeds.next_after(2), 4);
        assert_eq!(speeds.next_after(4), 1);
        assert_eq!(speeds.next_after(3), 1);
    }

    #[test]
    fn test_speed_set_normalizes() {
        let speeds = SpeedSet::try_from(vec![4, 0, 1, 4, 2]).unwrap();
        assert_eq!(speeds.as_slice(), &[1, 2, 4]);
        assert!(SpeedSet::try_from(vec![0]).is_err());

        let parsed: SpeedSet = serde_json::from_str("[8, 1]").unwrap();
        assert_eq!(parsed.as_slice(), &[1, 8]);
    }

    #[test]
    fn test_check_speed() {
        let speeds = SpeedSet::default();
        assert_eq!(speeds.check(2).unwrap(), 2);
        assert!(matches!(speeds.check(3), Err(Error::UnknownSpeed(3))));
    }
}
