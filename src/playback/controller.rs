use tracing::debug;

use crate::core::SimTime;
use crate::error::Result;
use crate::sync::{Command, StateUpdate};
use super::{PlaybackState, SpeedSet};

/// Something the controller needs done outside itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Send a command on the control channel
    Send(Command),
    /// Derive a snapshot for this time
    Derive(SimTime),
}

/// Playback state machine
///
/// Time only advances through confirmed ticks from the simulator; the
/// controller never runs its own clock. Commands that need the channel are
/// dropped along with their state change when the channel is not open.
/// Seeking never needs the channel.
#[derive(Debug, Clone)]
pub struct PlaybackController {
    state: PlaybackState,
    speeds: SpeedSet,
}

impl PlaybackController {
    pub fn new(speeds: SpeedSet, max_time: SimTime) -> Self {
        Self {
            state: PlaybackState {
                current_time: 0,
                max_time,
                is_playing: false,
                speed: speeds.first(),
            },
            speeds,
        }
    }

    /// Get current playback state
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn speeds(&self) -> &SpeedSet {
        &self.speeds
    }

    /// Start playback
    pub fn play(&mut self, channel_open: bool) -> Vec<Directive> {
        if !channel_open {
            debug!("Channel not open, dropping play");
            return Vec::new();
        }
        if self.state.is_playing {
            return Vec::new();
        }
        self.state.is_playing = true;
        vec![Directive::Send(Command::Play)]
    }

    /// Pause playback, freezing time at its last confirmed value
    pub fn pause(&mut self, channel_open: bool) -> Vec<Directive> {
        if !channel_open {
            debug!("Channel not open, dropping pause");
            return Vec::new();
        }
        if !self.state.is_playing {
            return Vec::new();
        }
        self.state.is_playing = false;
        vec![Directive::Send(Command::Pause)]
    }

    /// Stop and rewind to zero
    pub fn reset(&mut self, channel_open: bool) -> Vec<Directive> {
        if !channel_open {
            debug!("Channel not open, dropping reset");
            return Vec::new();
        }
        self.state.is_playing = false;
        self.state.current_time = 0;
        vec![Directive::Send(Command::Reset), Directive::Derive(0)]
    }

    /// Jump to `time`, optimistically and without changing mode
    pub fn seek(&mut self, time: SimTime, channel_open: bool) -> Vec<Directive> {
        let time = self.clamp(time);
        self.state.current_time = time;

        let mut directives = Vec::with_capacity(2);
        if channel_open {
            directives.push(Directive::Send(Command::Seek { time }));
        } else {
            debug!("Channel not open, seeking to {} locally only", time);
        }
        directives.push(Directive::Derive(time));
        directives
    }

    /// Move the time cursor without telling anyone (slider drag)
    pub fn scrub(&mut self, time: SimTime) {
        self.state.current_time = self.clamp(time);
    }

    /// Set the speed multiplier
    pub fn change_speed(&mut self, speed: u32, channel_open: bool) -> Result<Vec<Directive>> {
        let speed = self.speeds.check(speed)?;
        if !channel_open {
            debug!("Channel not open, dropping speed {}x", speed);
            return Ok(Vec::new());
        }
        self.state.speed = speed;
        Ok(vec![Directive::Send(Command::Speed { value: speed })])
    }

    /// The multiplier a speed-cycle button would select next
    pub fn next_speed(&self) -> u32 {
        self.speeds.next_after(self.state.speed)
    }

    /// Apply a tick confirmed by the simulator
    ///
    /// Confirmed values overwrite anything set optimistically. The simulator
    /// goes quiet once it reaches the end of the timeline, so a tick at
    /// `max_time` also ends playback here.
    pub fn confirm(&mut self, update: &StateUpdate) -> Vec<Directive> {
        let time = self.clamp(update.time);
        self.state.current_time = time;
        if let Some(playing) = update.is_playing {
            self.state.is_playing = playing;
        }
        if self.state.is_playing && time >= self.state.max_time {
            debug!("Reached end of timeline at {}, pausing", time);
            self.state.is_playing = false;
        }
        if let Some(speed) = update.speed {
            if self.speeds.contains(speed) {
                self.state.speed = speed;
            } else {
                debug!("Ignoring confirmed speed {}x outside the speed set", speed);
            }
        }
        vec![Directive::Derive(time)]
    }

    /// A derivation for `time` has been applied
    pub fn settle(&mut self, time: SimTime) {
        self.state.current_time = self.clamp(time);
    }

    /// A new schedule replaced the old one
    pub fn load(&mut self, max_time: SimTime, channel_open: bool) -> Vec<Directive> {
        self.state.max_time = max_time;
        self.state.current_time = 0;

        let mut directives = Vec::with_capacity(2);
        if channel_open {
            directives.push(Directive::Send(Command::SetMaxTime { value: max_time }));
        }
        directives.push(Directive::Derive(0));
        directives
    }

    fn clamp(&self, time: SimTime) -> SimTime {
        time.min(self.state.max_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn controller() -> PlaybackController {
        PlaybackController::new(SpeedSet::default(), 2000)
    }

    #[test]
    fn test_initial_state() {
        let c = controller();
        assert_eq!(c.state().current_time, 0);
        assert!(!c.state().is_playing);
        assert_eq!(c.state().speed, 1);
    }

    #[test]
    fn test_play_pause() {
        let mut c = controller();
        assert_eq!(c.play(true), vec![Directive::Send(Command::Play)]);
        assert!(c.state().is_playing);
        // play does not advance time locally
        assert_eq!(c.state().current_time, 0);
        assert!(c.play(true).is_empty());

        assert_eq!(c.pause(true), vec![Directive::Send(Command::Pause)]);
        assert!(!c.state().is_playing);
    }

    #[test]
    fn test_commands_dropped_when_channel_closed() {
        let mut c = controller();
        assert!(c.play(false).is_empty());
        assert!(!c.state().is_playing);

        c.seek(500, false);
        assert!(c.reset(false).is_empty());
        assert_eq!(c.state().current_time, 500);

        assert!(c.change_speed(4, false).unwrap().is_empty());
        assert_eq!(c.state().speed, 1);
    }

    #[test]
    fn test_seek_with_channel_closed_still_derives() {
        let mut c = controller();
        let directives = c.seek(300, false);
        assert_eq!(c.state().current_time, 300);
        assert_eq!(directives, vec![Directive::Derive(300)]);
    }

    #[test]
    fn test_seek_keeps_mode_and_clamps() {
        let mut c = controller();
        c.play(true);
        let directives = c.seek(5000, true);
        assert!(c.state().is_playing);
        assert_eq!(c.state().current_time, 2000);
        assert_eq!(
            directives,
            vec![Directive::Send(Command::Seek { time: 2000 }), Directive::Derive(2000)]
        );
    }

    #[test]
    fn test_reset_from_playing() {
        let mut c = controller();
        c.play(true);
        c.seek(700, true);
        let directives = c.reset(true);
        assert_eq!(directives, vec![Directive::Send(Command::Reset), Directive::Derive(0)]);
        assert_eq!(c.state().current_time, 0);
        assert!(!c.state().is_playing);
    }

    #[test]
    fn test_speed_cycle_from_last() {
        let mut c = controller();
        c.change_speed(4, true).unwrap();
        assert_eq!(c.next_speed(), 1);
        let directives = c.change_speed(c.next_speed(), true).unwrap();
        assert_eq!(directives, vec![Directive::Send(Command::Speed { value: 1 })]);
        assert_eq!(c.state().speed, 1);
    }

    #[test]
    fn test_unknown_speed_rejected() {
        let mut c = controller();
        assert!(matches!(c.change_speed(3, true), Err(Error::UnknownSpeed(3))));
        assert_eq!(c.state().speed, 1);
    }

    #[test]
    fn test_confirmed_tick_overrides_optimistic() {
        let mut c = controller();
        c.seek(300, true);
        let directives = c.confirm(&StateUpdate {
            time: 250,
            is_playing: Some(true),
            speed: Some(2),
        });
        assert_eq!(directives, vec![Directive::Derive(250)]);
        assert_eq!(c.state().current_time, 250);
        assert!(c.state().is_playing);
        assert_eq!(c.state().speed, 2);

        // simulator pauses explicitly
        c.confirm(&StateUpdate {
            time: 400,
            is_playing: Some(false),
            speed: Some(3),
        });
        assert!(!c.state().is_playing);
        assert_eq!(c.state().speed, 2);
    }

    #[test]
    fn test_tick_at_max_time_pauses() {
        let mut c = controller();
        c.load(160, true);
        c.play(true);

        c.confirm(&StateUpdate {
            time: 150,
            is_playing: Some(true),
            speed: None,
        });
        assert!(c.state().is_playing);

        // last tick still claims to be playing; no further ticks follow
        let directives = c.confirm(&StateUpdate {
            time: 170,
            is_playing: Some(true),
            speed: None,
        });
        assert_eq!(directives, vec![Directive::Derive(160)]);
        assert_eq!(c.state().current_time, 160);
        assert!(!c.state().is_playing);
    }

    #[test]
    fn test_scrub_is_local() {
        let mut c = controller();
        c.scrub(42);
        assert_eq!(c.state().current_time, 42);
    }

    #[test]
    fn test_load_sets_bounds() {
        let mut c = controller();
        c.seek(1500, true);
        let directives = c.load(160, true);
        assert_eq!(c.state().max_time, 160);
        assert_eq!(c.state().current_time, 0);
        assert_eq!(
            directives,
            vec![Directive::Send(Command::SetMaxTime { value: 160 }), Directive::Derive(0)]
        );
        assert_eq!(c.load(90, false), vec![Directive::Derive(0)]);
    }
}
