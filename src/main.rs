use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shop_timeline::api::{HttpScheduleApi, LocalStateSource, ScheduleApi, StateSource};
use shop_timeline::config::{Settings, StateSourceKind};
use shop_timeline::core::{format_time, SimTime};
use shop_timeline::export::write_batch_progress;
use shop_timeline::session::{Connector, Session, SessionHandle, View};
use shop_timeline::store::{Action, Notification, Store};

/// One line typed at the console
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleCommand {
    Load(Option<String>),
    Play,
    Pause,
    Reset,
    Seek(SimTime),
    Speed(Option<u32>),
    Status,
    Export(PathBuf),
    Reconnect,
    Quit,
}

fn parse_line(line: &str) -> std::result::Result<ConsoleCommand, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("empty command".to_string());
    };
    let arg = words.next();

    let command = match verb {
        "load" => ConsoleCommand::Load(arg.map(str::to_string)),
        "play" => ConsoleCommand::Play,
        "pause" => ConsoleCommand::Pause,
        "reset" => ConsoleCommand::Reset,
        "seek" => {
            let raw = arg.ok_or("usage: seek <minutes>")?;
            let time = raw.parse().map_err(|_| format!("not a time: {}", raw))?;
            ConsoleCommand::Seek(time)
        }
        "speed" => match arg {
            Some(raw) => {
                let raw = raw.trim_end_matches('x');
                let speed = raw.parse().map_err(|_| format!("not a speed: {}", raw))?;
                ConsoleCommand::Speed(Some(speed))
            }
            None => ConsoleCommand::Speed(None),
        },
        "status" => ConsoleCommand::Status,
        "export" => ConsoleCommand::Export(PathBuf::from(arg.ok_or("usage: export <path>")?)),
        "reconnect" => ConsoleCommand::Reconnect,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command: {}", other)),
    };
    Ok(command)
}

fn print_status(view: &View) {
    let playback = &view.playback;
    println!(
        "t={} / {}  {:?} {}x  channel={:?}",
        format_time(playback.current_time),
        format_time(playback.max_time),
        playback.mode(),
        playback.speed,
        view.channel,
    );

    if !view.model.is_empty() {
        println!(
            "schedule: {} batches, {} vehicles, loaded {}",
            view.model.batches().len(),
            view.model.vehicles().len(),
            view.model.loaded_at().format("%H:%M:%S")
        );
    }

    let fleet = &view.snapshot.fleet;
    println!(
        "fleet: {}% ({} done, {} running, {} waiting)",
        fleet.percent, fleet.completed, fleet.in_progress, fleet.waiting
    );
    for (batch_id, progress) in &view.snapshot.batches {
        println!(
            "  {:<16} {:>3}%  {}/{}",
            batch_id, progress.percent, progress.completed, progress.total
        );
    }
    for station in view.snapshot.stations.values() {
        let batch = station.current_batch.as_deref().unwrap_or("-");
        println!(
            "  {:<16} {:?}  batch={}  busy={}",
            station.name,
            station.status,
            batch,
            station.busy_workstations()
        );
    }
}

/// Notifications in `current` that were not in `previous`
fn fresh<'a>(previous: &[Notification], current: &'a [Notification]) -> &'a [Notification] {
    match previous.last() {
        Some(last) => match current.iter().rposition(|n| n == last) {
            Some(idx) => &current[idx + 1..],
            None => current,
        },
        None => current,
    }
}

fn export(view: &View, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_batch_progress(&view.model, &view.snapshot, file)?;
    Ok(())
}

fn handle_line(handle: &SessionHandle, settings: &Settings, line: &str) -> bool {
    let command = match parse_line(line) {
        Ok(command) => command,
        Err(e) => {
            println!("{}", e);
            return true;
        }
    };

    match command {
        ConsoleCommand::Load(file) => handle.dispatch(Action::LoadSchedule {
            order_file: file.unwrap_or_else(|| settings.order_file.clone()),
        }),
        ConsoleCommand::Play => handle.dispatch(Action::Play),
        ConsoleCommand::Pause => handle.dispatch(Action::Pause),
        ConsoleCommand::Reset => handle.dispatch(Action::Reset),
        ConsoleCommand::Seek(time) => handle.dispatch(Action::Seek(time)),
        ConsoleCommand::Speed(Some(speed)) => handle.dispatch(Action::ChangeSpeed(speed)),
        ConsoleCommand::Speed(None) => handle.dispatch(Action::CycleSpeed),
        ConsoleCommand::Status => print_status(&handle.view()),
        ConsoleCommand::Export(path) => match export(&handle.view(), &path) {
            Ok(()) => println!("wrote {}", path.display()),
            Err(e) => println!("export failed: {:#}", e),
        },
        ConsoleCommand::Reconnect => handle.connect(),
        ConsoleCommand::Quit => return false,
    }
    true
}

async fn run(settings: Settings) -> Result<()> {
    let http = Arc::new(
        HttpScheduleApi::new(&settings.api_base_url, settings.request_timeout())
            .context("building HTTP client")?,
    );
    let api: Arc<dyn ScheduleApi> = http.clone();
    let source: Arc<dyn StateSource> = match settings.state_source {
        StateSourceKind::Remote => http,
        StateSourceKind::Local => Arc::new(LocalStateSource),
    };

    let channel_settings = settings.clone();
    let connector: Connector = Box::new(move || Some(channel_settings.control_transport()));

    let store = Store::new(settings.speeds.clone(), settings.default_max_time, settings.load_policy());
    let session = Session::new(store, api, source, connector);
    let handle = session.handle();
    let session_task = tokio::spawn(session.run());

    // Echo notifications as they arrive
    let mut views = handle.watch();
    let printer = tokio::spawn(async move {
        let mut seen: Vec<Notification> = Vec::new();
        while views.changed().await.is_ok() {
            let current = views.borrow_and_update().notifications.clone();
            for notification in fresh(&seen, &current) {
                println!("{}", notification);
            }
            seen = current;
        }
    });

    handle.connect();
    println!("commands: load [file], play, pause, reset, seek <t>, speed [<x>], status, export <path>, reconnect, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        if !handle_line(&handle, &settings, &line) {
            break;
        }
    }

    handle.shutdown();
    if let Err(e) = session_task.await {
        warn!("Session task failed: {}", e);
    }
    printer.abort();
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load();
    if let Some(path) = Settings::config_path() {
        if !path.exists() {
            if let Err(e) = settings.save() {
                warn!("Could not write default settings to {:?}: {}", path, e);
            }
        }
    }
    info!("Scheduling service at {}", settings.api_base_url);

    let rt = tokio::runtime::Runtime::new().context("creating Tokio runtime")?;
    rt.block_on(run(settings))
}
