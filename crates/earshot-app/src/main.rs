mod cli;
mod settings;
mod sink;
mod watcher;

use std::sync::Arc;

use clap::CommandFactory;
use earshot_common::{EarshotError, ParticipantId, PositionFeed};
use earshot_config::EarshotConfig;
use earshot_proximity::ProximityDispatcher;
use earshot_relay::{RelayHub, RelaySession, SessionState};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Command};
use crate::sink::LogSink;
use crate::watcher::PositionWatcher;

/// Peer events buffered between the session and the dispatcher.
const PEER_EVENT_QUEUE: usize = 256;

fn init_logging(args: &Args, config: &EarshotConfig) {
    let directive = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.filter_directive());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Config file plus command-line overrides.
fn effective_config(args: &Args) -> Result<EarshotConfig, EarshotError> {
    let mut config = earshot_config::load_config(args.config.as_deref())?;
    if let Some(id) = &args.participant_id {
        config.identity.participant_id = id.clone();
    }
    if let Some(path) = &args.position_file {
        config.position_source.path = path.display().to_string();
    }
    Ok(config)
}

#[tokio::main]
async fn main() {
    let args = cli::parse();

    let config = match effective_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("earshot: {e}");
            std::process::exit(1);
        }
    };

    if args.print_config {
        println!("{}", earshot_config::config_to_json(&config));
        return;
    }

    init_logging(&args, &config);
    tracing::info!("earshot v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = earshot_config::validation::validate(&config) {
        tracing::error!(error = %e, "Refusing to start with an invalid config");
        std::process::exit(1);
    }

    let Some(command) = args.command else {
        let _ = Args::command().print_help();
        std::process::exit(2);
    };

    if let Err(e) = run(command, config).await {
        tracing::error!(error = %e, "earshot stopped with an error");
        std::process::exit(1);
    }
    tracing::info!("Shutdown complete");
}

async fn run(command: Command, config: EarshotConfig) -> Result<(), EarshotError> {
    let local = ParticipantId::new(config.identity.participant_id.as_str()).map_err(|e| {
        EarshotError::Other(format!(
            "a participant id is required (--participant-id or [identity] participant_id): {e}"
        ))
    })?;

    // 1. Hub, when hosting. The host joins its own hub like everyone else.
    let (hub, hub_url) = match command {
        Command::Host { port } => {
            let hub = RelayHub::start(settings::hub_config(&config.hub, port)).await?;
            let url = settings::loopback_url(hub.local_addr().port());
            (Some(hub), url)
        }
        Command::Join { hub } => {
            let url = hub.unwrap_or_else(|| config.session.hub_url.clone());
            (None, url)
        }
    };

    // 2. Local position source.
    let feed = PositionFeed::default();
    let watcher_shutdown = CancellationToken::new();
    let watcher_task = spawn_watcher(&config, &feed, &watcher_shutdown);

    // 3. Dispatcher, subscribed before the session can produce anything.
    let (event_tx, event_rx) = mpsc::channel(PEER_EVENT_QUEUE);
    let local_rx = feed.subscribe();
    let sink = Arc::new(LogSink::new());
    let dispatcher = ProximityDispatcher::new(
        local.clone(),
        config.proximity.audio_shape,
        sink.clone(),
        feed.last_known(),
    );
    let dispatcher_shutdown = CancellationToken::new();
    let dispatcher_task = tokio::spawn(dispatcher.run(event_rx, local_rx, dispatcher_shutdown.clone()));

    // 4. Session.
    let session = RelaySession::start(
        settings::session_config(&config.session, &hub_url),
        local,
        feed.clone(),
        event_tx,
    );

    let mut state = session.watch_state();
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            }
            tracing::info!("Shutting down");
        }
        _ = state.wait_for(|s| *s == SessionState::Closed) => {
            tracing::warn!("Relay session closed");
        }
    }

    // Voices first, then the session, then the position source and hub.
    dispatcher_shutdown.cancel();
    if let Err(e) = dispatcher_task.await {
        tracing::error!(error = %e, "Dispatcher task failed");
    }
    let adjusted = sink.adjusted();
    if adjusted > 0 {
        tracing::warn!(voices = adjusted, "Voices left away from their defaults");
    }
    let session_result = session.shutdown().await;

    watcher_shutdown.cancel();
    if let Some(task) = watcher_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Position watcher task failed");
        }
    }

    if let Some(hub) = hub {
        hub.shutdown().await;
    }

    session_result.map_err(Into::into)
}

fn spawn_watcher(
    config: &EarshotConfig,
    feed: &PositionFeed,
    shutdown: &CancellationToken,
) -> Option<JoinHandle<()>> {
    let Some(path) = config.position_source.resolved_path() else {
        tracing::warn!("No position file path could be determined; local position stays unknown");
        return None;
    };
    let watcher = PositionWatcher::new(path);
    let feed = feed.clone();
    let shutdown = shutdown.clone();
    Some(tokio::spawn(async move {
        if let Err(e) = watcher.watch(feed, shutdown).await {
            tracing::warn!(path = %watcher.path().display(), error = %e, "Position watcher stopped");
        }
    }))
}
