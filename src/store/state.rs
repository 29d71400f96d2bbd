use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::SimTime;
use crate::derive::{derive_snapshot, Snapshot};
use crate::playback::{Directive, PlaybackController, PlaybackState, SpeedSet};
use crate::sync::{ChannelEvent, ChannelStatus};
use crate::timeline::{LoadPolicy, TimelineModel};
use super::action::{Action, DerivationRequest, Effect, LoadedSchedule};
use super::notification::{Notification, NotificationLevel};

/// Notifications kept for display
const MAX_NOTIFICATIONS: usize = 32;

/// Single owner of playback state, the loaded timeline and the displayed
/// snapshot
///
/// All mutation goes through [`dispatch`](Self::dispatch). The store does no
/// I/O: it returns [`Effect`]s and later receives their outcomes as actions.
/// Outcomes are tagged with the sequence number they were issued under, and
/// anything but the latest issued request is discarded on arrival.
pub struct Store {
    model: Arc<TimelineModel>,
    controller: PlaybackController,
    snapshot: Arc<Snapshot>,
    channel: ChannelStatus,
    policy: LoadPolicy,
    derive_seq: u64,
    load_seq: u64,
    /// Cursor scrubbed since the latest derivation was requested
    scrubbed: bool,
    notifications: VecDeque<Notification>,
}

impl Store {
    pub fn new(speeds: SpeedSet, default_max_time: SimTime, policy: LoadPolicy) -> Self {
        Self {
            model: Arc::new(TimelineModel::empty()),
            controller: PlaybackController::new(speeds, default_max_time),
            snapshot: Arc::new(Snapshot::default()),
            channel: ChannelStatus::Closed,
            policy,
            derive_seq: 0,
            load_seq: 0,
            scrubbed: false,
            notifications: VecDeque::new(),
        }
    }

    pub fn playback(&self) -> PlaybackState {
        *self.controller.state()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.clone()
    }

    pub fn model(&self) -> Arc<TimelineModel> {
        self.model.clone()
    }

    pub fn channel(&self) -> ChannelStatus {
        self.channel
    }

    pub fn speeds(&self) -> &SpeedSet {
        self.controller.speeds()
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    /// Apply one action and return the work it calls for
    pub fn dispatch(&mut self, action: Action) -> Vec<Effect> {
        let open = self.channel.is_open();
        match action {
            Action::Play => {
                let directives = self.controller.play(open);
                self.run(directives)
            }
            Action::Pause => {
                let directives = self.controller.pause(open);
                self.run(directives)
            }
            Action::Reset => {
                let directives = self.controller.reset(open);
                self.run(directives)
            }
            Action::Seek(time) => {
                let directives = self.controller.seek(time, open);
                self.run(directives)
            }
            Action::Scrub(time) => {
                self.controller.scrub(time);
                self.scrubbed = true;
                Vec::new()
            }
            Action::ChangeSpeed(speed) => self.change_speed(speed),
            Action::CycleSpeed => {
                let next = self.controller.next_speed();
                self.change_speed(next)
            }
            Action::LoadSchedule { order_file } => {
                self.load_seq += 1;
                info!("Loading schedule from order {} (load #{})", order_file, self.load_seq);
                vec![Effect::Load {
                    seq: self.load_seq,
                    order_file,
                }]
            }
            Action::ScheduleLoaded { seq, outcome } => self.schedule_loaded(seq, outcome),
            Action::Channel(event) => self.channel_event(event),
            Action::Derived { seq, time, outcome } => {
                if seq != self.derive_seq {
                    debug!(
                        "Discarding stale state for t={} (request #{}, latest #{})",
                        time, seq, self.derive_seq
                    );
                    return Vec::new();
                }
                match outcome {
                    Ok(occupancy) => {
                        self.snapshot = Arc::new(derive_snapshot(&self.model, time, Some(&occupancy)));
                        if !self.scrubbed {
                            self.controller.settle(time);
                        }
                    }
                    Err(e) => warn!("Failed to fetch state at t={}, keeping previous snapshot: {}", time, e),
                }
                Vec::new()
            }
        }
    }

    fn change_speed(&mut self, speed: u32) -> Vec<Effect> {
        match self.controller.change_speed(speed, self.channel.is_open()) {
            Ok(directives) => self.run(directives),
            Err(e) => {
                warn!("{}", e);
                self.notify(NotificationLevel::Warning, e.to_string());
                Vec::new()
            }
        }
    }

    fn schedule_loaded(&mut self, seq: u64, outcome: crate::error::Result<LoadedSchedule>) -> Vec<Effect> {
        if seq != self.load_seq {
            debug!("Discarding superseded load #{} (latest #{})", seq, self.load_seq);
            return Vec::new();
        }

        let loaded = match outcome {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Schedule load failed: {}", e);
                self.notify(NotificationLevel::Error, format!("failed to load schedule: {}", e));
                return Vec::new();
            }
        };

        let model = match TimelineModel::build(loaded.result, self.policy) {
            Ok(model) => Arc::new(model),
            Err(e) => {
                warn!("Rejected schedule: {}", e);
                self.notify(NotificationLevel::Error, format!("failed to load schedule: {}", e));
                return Vec::new();
            }
        };

        self.snapshot = Arc::new(derive_snapshot(&model, 0, None));
        self.model = model;
        self.notify(
            NotificationLevel::Success,
            format!(
                "schedule loaded: {} batches, {} vehicles",
                loaded.summary.total_batches, loaded.summary.total_vehicles
            ),
        );

        let directives = self.controller.load(self.model.max_time(), self.channel.is_open());
        self.run(directives)
    }

    fn channel_event(&mut self, event: ChannelEvent) -> Vec<Effect> {
        match event {
            ChannelEvent::Opened => {
                self.channel = ChannelStatus::Open;
                Vec::new()
            }
            ChannelEvent::Update(update) => {
                let directives = self.controller.confirm(&update);
                self.run(directives)
            }
            ChannelEvent::Errored(reason) => {
                self.channel = ChannelStatus::Error;
                self.notify(
                    NotificationLevel::Warning,
                    format!("control channel unavailable, seek only: {}", reason),
                );
                Vec::new()
            }
            ChannelEvent::Closed => {
                self.channel = ChannelStatus::Closed;
                Vec::new()
            }
        }
    }

    fn run(&mut self, directives: Vec<Directive>) -> Vec<Effect> {
        directives
            .into_iter()
            .map(|directive| match directive {
                Directive::Send(command) => Effect::Send(command),
                Directive::Derive(time) => {
                    self.derive_seq += 1;
                    self.scrubbed = false;
                    Effect::Fetch(DerivationRequest {
                        seq: self.derive_seq,
                        time,
                        model: self.model.clone(),
                    })
                }
            })
            .collect()
    }

    fn notify(&mut self, level: NotificationLevel, text: String) {
        if self.notifications.len() == MAX_NOTIFICATIONS {
            self.notifications.pop_front();
        }
        self.notifications.push_back(Notification::new(level, text));
    }
}
