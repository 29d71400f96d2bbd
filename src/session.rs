//! Event loop that owns the [`Store`] and carries out its effects
//!
//! Every state change is serialized through one task: user actions, channel
//! events and completed requests all arrive on the same queue. Requests run
//! as spawned tasks and report back through that queue, so nothing blocks
//! the loop and no state is shared.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::api::{ScheduleApi, StateSource};
use crate::derive::Snapshot;
use crate::error::Result;
use crate::playback::PlaybackState;
use crate::store::{Action, DerivationRequest, Effect, LoadedSchedule, Notification, Store};
use crate::sync::{ChannelEvent, ChannelStatus, ControlTransport, SyncAdapter};
use crate::timeline::TimelineModel;

/// Produces a fresh transport for each (re)connect; `None` if unavailable
pub type Connector = Box<dyn FnMut() -> Option<Box<dyn ControlTransport>> + Send>;

enum Event {
    Action(Action),
    /// Tagged with the connect attempt that produced it
    Channel { generation: u64, event: ChannelEvent },
    Connect,
    Shutdown,
}

/// Read model published after every event
#[derive(Debug, Clone)]
pub struct View {
    pub playback: PlaybackState,
    pub snapshot: Arc<Snapshot>,
    pub model: Arc<TimelineModel>,
    pub channel: ChannelStatus,
    pub notifications: Vec<Notification>,
}

impl View {
    fn of(store: &Store) -> Self {
        Self {
            playback: store.playback(),
            snapshot: store.snapshot(),
            model: store.model(),
            channel: store.channel(),
            notifications: store.notifications().cloned().collect(),
        }
    }
}

/// Cloneable handle for feeding a running [`Session`]
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<Event>,
    view: watch::Receiver<View>,
}

impl SessionHandle {
    pub fn dispatch(&self, action: Action) {
        if self.events.send(Event::Action(action)).is_err() {
            debug!("Session has stopped, action dropped");
        }
    }

    /// Open a new control channel, discarding any previous one
    pub fn connect(&self) {
        let _ = self.events.send(Event::Connect);
    }

    pub fn shutdown(&self) {
        let _ = self.events.send(Event::Shutdown);
    }

    /// Latest published view
    pub fn view(&self) -> View {
        self.view.borrow().clone()
    }

    /// Subscribe to view changes
    pub fn watch(&self) -> watch::Receiver<View> {
        self.view.clone()
    }
}

pub struct Session {
    store: Store,
    api: Arc<dyn ScheduleApi>,
    source: Arc<dyn StateSource>,
    connector: Connector,
    adapter: Option<SyncAdapter>,
    generation: u64,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    view_tx: watch::Sender<View>,
    handle: SessionHandle,
}

impl Session {
    pub fn new(
        store: Store,
        api: Arc<dyn ScheduleApi>,
        source: Arc<dyn StateSource>,
        connector: Connector,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(View::of(&store));
        let handle = SessionHandle {
            events: events_tx.clone(),
            view: view_rx,
        };
        Self {
            store,
            api,
            source,
            connector,
            adapter: None,
            generation: 0,
            events_tx,
            events_rx,
            view_tx,
            handle,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Process events until shutdown
    pub async fn run(mut self) {
        info!("Session started");
        while let Some(event) = self.events_rx.recv().await {
            match event {
                Event::Action(action) => {
                    let effects = self.store.dispatch(action);
                    self.execute(effects);
                }
                Event::Channel { generation, event } => self.channel_event(generation, event),
                Event::Connect => self.connect(),
                Event::Shutdown => break,
            }
            self.view_tx.send_replace(View::of(&self.store));
        }

        if let Some(mut adapter) = self.adapter.take() {
            adapter.close();
            adapter.join().await;
        }
        info!("Session stopped");
    }

    fn channel_event(&mut self, generation: u64, event: ChannelEvent) {
        if generation != self.generation {
            debug!("Ignoring {:?} from replaced control channel #{}", event, generation);
            return;
        }
        if event == ChannelEvent::Closed {
            // a closed adapter is spent
            self.adapter = None;
        }
        let effects = self.store.dispatch(Action::Channel(event));
        self.execute(effects);
    }

    fn connect(&mut self) {
        self.generation += 1;
        if let Some(mut old) = self.adapter.take() {
            debug!("Discarding control channel {}", old.name());
            old.close();
            let effects = self.store.dispatch(Action::Channel(ChannelEvent::Closed));
            self.execute(effects);
        }
        let Some(transport) = (self.connector)() else {
            debug!("No control transport available");
            return;
        };

        let mut adapter = SyncAdapter::new(transport);
        let events = self.events_tx.clone();
        let generation = self.generation;
        adapter.on_message(move |event| {
            let _ = events.send(Event::Channel { generation, event });
        });
        adapter.start();
        self.adapter = Some(adapter);
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(command) => match &self.adapter {
                    Some(adapter) => adapter.send(&command),
                    None => debug!("No control channel, dropping {:?}", command),
                },
                Effect::Fetch(request) => self.fetch(request),
                Effect::Load { seq, order_file } => self.load(seq, order_file),
            }
        }
    }

    fn fetch(&self, request: DerivationRequest) {
        let source = self.source.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let DerivationRequest { seq, time, model } = request;
            let outcome = source.state_at(model, time).await;
            let _ = events.send(Event::Action(Action::Derived { seq, time, outcome }));
        });
    }

    fn load(&self, seq: u64, order_file: String) {
        let api = self.api.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome: Result<LoadedSchedule> = async {
                let summary = api.create_schedule(&order_file).await?;
                let mut result = api.fetch_result().await?;
                // the live station list carries each station's current batch
                match api.stations().await {
                    Ok(stations) if !stations.is_empty() => result.stations = stations,
                    Ok(_) => debug!("Empty station list, keeping the result's stations"),
                    Err(e) => warn!("Station list unavailable, keeping the result's stations: {}", e),
                }
                Ok(LoadedSchedule { summary, result })
            }
            .await;
            let _ = events.send(Event::Action(Action::ScheduleLoaded { seq, outcome }));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LocalStateSource;
    use crate::core::{ScheduleResult, ScheduleSummary, SimTime, Station};
    use crate::derive::{local_occupancy, OccupancySnapshot};
    use crate::error::{Error, Result};
    use crate::playback::SpeedSet;
    use crate::store::NotificationLevel;
    use crate::sync::{MockPeer, MockTransport};
    use crate::timeline::model::fixtures::sample_result;
    use crate::timeline::{LoadPolicy, TimelineModel};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct FakeApi {
        fail: bool,
    }

    #[async_trait]
    impl ScheduleApi for FakeApi {
        async fn create_schedule(&self, _order_file: &str) -> Result<ScheduleSummary> {
            if self.fail {
                return Err(Error::NoSchedule);
            }
            Ok(ScheduleSummary {
                success: true,
                message: String::new(),
                total_batches: 2,
                total_vehicles: 4,
                total_time: 160,
            })
        }

        async fn fetch_result(&self) -> Result<ScheduleResult> {
            Ok(sample_result())
        }

        async fn stations(&self) -> Result<Vec<Station>> {
            let mut stations = sample_result().stations;
            stations[1].current_batch = Some("B2".into());
            Ok(stations)
        }
    }

    /// Holds each request until the test releases its time
    #[derive(Default)]
    struct GatedSource {
        gates: Mutex<HashMap<SimTime, Arc<Notify>>>,
    }

    impl GatedSource {
        fn gate(&self, time: SimTime) -> Arc<Notify> {
            self.gates.lock().unwrap().entry(time).or_default().clone()
        }
    }

    #[async_trait]
    impl StateSource for GatedSource {
        async fn state_at(&self, model: Arc<TimelineModel>, time: SimTime) -> Result<OccupancySnapshot> {
            self.gate(time).notified().await;
            Ok(local_occupancy(&model, time))
        }
    }

    fn no_channel() -> Connector {
        Box::new(|| None)
    }

    fn mock_channel() -> (Connector, MockPeer) {
        let (transport, peer) = MockTransport::pair("sim");
        let mut slot = Some(transport);
        let connector: Connector = Box::new(move || {
            slot.take()
                .map(|t| Box::new(t) as Box<dyn ControlTransport>)
        });
        (connector, peer)
    }

    /// Hands out each transport once, in order
    fn mock_channels(count: usize) -> (Connector, Vec<MockPeer>) {
        let mut transports = Vec::new();
        let mut peers = Vec::new();
        for i in 0..count {
            let (transport, peer) = MockTransport::pair(&format!("sim-{}", i));
            transports.push(transport);
            peers.push(peer);
        }
        let mut transports = transports.into_iter();
        let connector: Connector = Box::new(move || {
            transports
                .next()
                .map(|t| Box::new(t) as Box<dyn ControlTransport>)
        });
        (connector, peers)
    }

    fn session(api: FakeApi, source: Arc<dyn StateSource>, connector: Connector) -> (SessionHandle, tokio::task::JoinHandle<()>) {
        let store = Store::new(SpeedSet::default(), 2000, LoadPolicy::default());
        let session = Session::new(store, Arc::new(api), source, connector);
        let handle = session.handle();
        (handle, tokio::spawn(session.run()))
    }

    async fn wait_for(handle: &SessionHandle, mut pred: impl FnMut(&View) -> bool) -> View {
        let mut rx = handle.watch();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                {
                    let view = rx.borrow_and_update();
                    if pred(&view) {
                        return view.clone();
                    }
                }
                rx.changed().await.expect("session ended");
            }
        })
        .await
        .expect("timed out waiting for view")
    }

    #[tokio::test]
    async fn test_load_and_seek_offline() {
        let (handle, task) = session(FakeApi { fail: false }, Arc::new(LocalStateSource), no_channel());

        handle.dispatch(Action::LoadSchedule {
            order_file: "test_orders_001.json".into(),
        });
        let view = wait_for(&handle, |v| v.playback.max_time == 160).await;
        assert_eq!(view.notifications.last().unwrap().level, NotificationLevel::Success);
        // current batch comes from the station list
        assert_eq!(view.snapshot.stations["South"].current_batch.as_deref(), Some("B2"));

        handle.dispatch(Action::Seek(300));
        let view = wait_for(&handle, |v| v.snapshot.time == 160).await;
        assert_eq!(view.playback.current_time, 160);
        assert_eq!(view.snapshot.fleet.percent, 75);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_seek_resolves_with_channel_closed() {
        let (handle, task) = session(FakeApi { fail: false }, Arc::new(LocalStateSource), no_channel());

        handle.dispatch(Action::Seek(300));
        let view = wait_for(&handle, |v| v.playback.current_time == 300).await;
        assert_eq!(view.channel, ChannelStatus::Closed);
        wait_for(&handle, |v| v.snapshot.time == 300).await;

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_load_notifies() {
        let (handle, task) = session(FakeApi { fail: true }, Arc::new(LocalStateSource), no_channel());

        handle.dispatch(Action::LoadSchedule { order_file: "x".into() });
        let view = wait_for(&handle, |v| !v.notifications.is_empty()).await;
        assert_eq!(view.notifications[0].level, NotificationLevel::Error);
        assert_eq!(view.playback.max_time, 2000);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_late_stale_response_is_ignored() {
        let source = Arc::new(GatedSource::default());
        let (handle, task) = session(FakeApi { fail: false }, source.clone(), no_channel());

        handle.dispatch(Action::Seek(10));
        handle.dispatch(Action::Seek(20));
        wait_for(&handle, |v| v.playback.current_time == 20).await;

        source.gate(20).notify_one();
        wait_for(&handle, |v| v.snapshot.time == 20).await;

        source.gate(10).notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let view = handle.view();
        assert_eq!(view.snapshot.time, 20);
        assert_eq!(view.playback.current_time, 20);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_channel_play_and_ticks() {
        let (connector, peer) = mock_channel();
        let (handle, task) = session(FakeApi { fail: false }, Arc::new(LocalStateSource), connector);

        handle.dispatch(Action::LoadSchedule { order_file: "o".into() });
        wait_for(&handle, |v| v.playback.max_time == 160).await;

        handle.connect();
        wait_for(&handle, |v| v.channel == ChannelStatus::Open).await;

        handle.dispatch(Action::Play);
        wait_for(&handle, |v| v.playback.is_playing).await;

        peer.push(r#"{"type":"state_update","time":40,"is_playing":true,"speed":1}"#);
        peer.push(r#"{"type":"something_new"}"#);
        let view = wait_for(&handle, |v| v.snapshot.time == 40).await;
        assert_eq!(view.playback.current_time, 40);

        tokio::time::timeout(Duration::from_secs(2), async {
            while !peer.sent().iter().any(|s| s == r#"{"command":"play"}"#) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("play command never sent");

        peer.hang_up();
        wait_for(&handle, |v| v.channel == ChannelStatus::Closed).await;

        // channel gone: play is dropped, seek still works
        handle.dispatch(Action::Pause);
        handle.dispatch(Action::Seek(100));
        let view = wait_for(&handle, |v| v.snapshot.time == 100).await;
        assert!(view.playback.is_playing);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_reconnect_keeps_new_channel() {
        let (connector, peers) = mock_channels(2);
        let (handle, task) = session(FakeApi { fail: false }, Arc::new(LocalStateSource), connector);

        handle.connect();
        wait_for(&handle, |v| v.channel == ChannelStatus::Open).await;

        // the first adapter reports Closed after the second one is current
        handle.connect();
        wait_for(&handle, |v| v.channel == ChannelStatus::Open).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.view().channel, ChannelStatus::Open);

        handle.dispatch(Action::Play);
        wait_for(&handle, |v| v.playback.is_playing).await;
        tokio::time::timeout(Duration::from_secs(2), async {
            while peers[1].sent().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("play never reached the new channel");
        assert_eq!(peers[1].sent(), vec![r#"{"command":"play"}"#.to_string()]);
        assert!(peers[0].sent().is_empty());

        handle.shutdown();
        task.await.unwrap();
    }
}
