//! launchpadd — the Launchpad daemon and operator CLI.
//!
//! Hosts the state store, the lifecycle event bus with its deploy-log
//! recorder, and the expiry sweeper. The remaining subcommands expose the
//! app and deploy-event repositories to operators.
//!
//! # Usage
//!
//! ```text
//! launchpadd --config /etc/launchpad/launchpad.toml run
//! launchpadd app add my-app --ttl 2h --repository git://example/my-app
//! launchpadd next my-app
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use launchpad_bus::{ChannelErrorSink, DeployLogRecorder, EventBus, JobEvent};
use launchpad_core::config::parse_duration;
use launchpad_core::{CommandLogFetcher, LaunchpadConfig, LogFetcher};
use launchpad_state::{AppRepository, DeployEventRepository, StateStore};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info};

mod sweeper;

use sweeper::Sweeper;

#[derive(Parser)]
#[command(name = "launchpadd", about = "Launchpad daemon", version)]
struct Cli {
    /// Path to launchpad.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides [store].path).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon: deploy-log recorder plus periodic expiry sweeps.
    Run {
        /// Sweep interval (overrides [sweep].interval), e.g. "30s".
        #[arg(long)]
        interval: Option<String>,
    },
    /// Kill every expired app once and exit.
    Sweep,
    /// Manage apps.
    App {
        #[command(subcommand)]
        action: AppAction,
    },
    /// Print the deploy log of an app, oldest first.
    Events { app: String },
    /// Print the oldest unread deploy event of an app and mark it read.
    Next { app: String },
    /// Fetch raw logs for an app from the orchestration CLI.
    Logs { app: String },
    /// Publish a job event on a lifecycle topic and record it.
    Record {
        topic: String,
        app: String,
        message: String,
    },
}

#[derive(Subcommand)]
enum AppAction {
    /// Register a new app.
    Add {
        id: String,
        /// Lifetime from now, e.g. "2h".
        #[arg(long, default_value = "1h")]
        ttl: String,
        /// Source repository the app is built from.
        #[arg(long)]
        repository: String,
    },
    /// Show one app.
    Get { id: String },
    /// List all apps.
    List,
    /// List apps past their deadline that are still alive.
    Expired,
    /// Mark an app killed.
    Kill { id: String },
    /// Push an app's deadline back.
    Extend {
        id: String,
        /// Extra lifetime, e.g. "30m".
        #[arg(long)]
        by: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,launchpadd=debug,launchpad=debug"))?,
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = LaunchpadConfig::load(cli.config.as_deref())?;
    let db_path = cli.db.unwrap_or_else(|| config.store.path.clone());
    let open = || open_store(&db_path);

    match cli.command {
        Command::Run { interval } => {
            let interval = match interval {
                Some(s) => parse_duration(&s)?,
                None => config.sweep.interval()?,
            };
            run(open()?, interval).await
        }
        Command::Sweep => {
            let report = Sweeper::new(Arc::new(open()?)).sweep()?;
            print_json(&report)
        }
        Command::App { action } => app_command(action, &open()?),
        Command::Events { app } => print_json(&open()?.get_app_deploy_logs(&app)?),
        Command::Next { app } => next_message(&open()?, &app),
        Command::Logs { app } => {
            // No store needed.
            let fetcher = CommandLogFetcher::from_config(&config.logs);
            print!("{}", fetcher.fetch_logs(&app)?);
            Ok(())
        }
        Command::Record {
            topic,
            app,
            message,
        } => record(open()?, &topic, app, message),
    }
}

fn open_store(db_path: &std::path::Path) -> anyhow::Result<StateStore> {
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let store = StateStore::open(db_path)
        .with_context(|| format!("failed to open state store at {}", db_path.display()))?;
    info!(path = ?db_path, "state store opened");
    Ok(store)
}

/// Pop one message off the unread queue: print it, then mark it read.
fn next_message(store: &StateStore, app: &str) -> anyhow::Result<()> {
    match store.get_next_unread_message(app) {
        Ok(mut event) => {
            print_json(&event)?;
            store.mark_read(&mut event)?;
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            info!(%app, "no unread deploy events");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Publish one job event through a recorder attached to a fresh bus.
fn record(store: StateStore, topic: &str, app: String, message: String) -> anyhow::Result<()> {
    let bus = EventBus::new();
    let (sink, mut failures) = ChannelErrorSink::new();
    DeployLogRecorder::attach(&bus, Arc::new(store), Arc::new(sink));

    let mut job = JobEvent::new(app, message);
    if bus.publish(topic, &mut job) == 0 {
        anyhow::bail!("{topic} is not a lifecycle topic");
    }
    if let Ok(failure) = failures.try_recv() {
        return Err(failure.error).context(format!("failed to record event on {topic}"));
    }
    print_json(&job)
}

fn app_command(action: AppAction, store: &StateStore) -> anyhow::Result<()> {
    match action {
        AppAction::Add {
            id,
            ttl,
            repository,
        } => {
            let ttl = deadline_after(chrono::Utc::now(), &ttl)?;
            print_json(&store.add_app(&id, ttl, &repository)?)
        }
        AppAction::Get { id } => print_json(&store.get_app(&id)?),
        AppAction::List => print_json(&store.list_apps()?),
        AppAction::Expired => print_json(&store.get_expired_apps()?),
        AppAction::Kill { id } => {
            let mut app = store.get_app(&id)?;
            store.kill_app(&mut app)?;
            print_json(&app)
        }
        AppAction::Extend { id, by } => {
            let mut app = store.get_app(&id)?;
            app.expires_at = deadline_after(app.expires_at, &by)?;
            store.update_app(&app)?;
            print_json(&app)
        }
    }
}

/// `from` pushed forward by a duration string such as "2h".
fn deadline_after(from: DateTime<Utc>, by: &str) -> anyhow::Result<DateTime<Utc>> {
    let delta = chrono::Duration::from_std(parse_duration(by)?)
        .with_context(|| format!("ttl {by:?} out of range"))?;
    from.checked_add_signed(delta)
        .with_context(|| format!("ttl {by:?} out of range"))
}

/// Host the recorder and the sweeper until Ctrl-C.
///
/// The bus lives for the whole daemon run and is the attachment point for
/// in-process producers (clone, parse, deploy workers): anything holding a
/// clone of it and publishing on a lifecycle topic lands in the deploy log.
/// Out-of-process producers go through `launchpadd record`.
async fn run(store: StateStore, interval: Duration) -> anyhow::Result<()> {
    info!("Launchpad daemon starting");

    // Event bus with the deploy-log recorder. Recorder failures are
    // supervised here instead of aborting the process.
    let bus = EventBus::new();
    let (sink, mut failures) = ChannelErrorSink::new();
    DeployLogRecorder::attach(&bus, Arc::new(store.clone()), Arc::new(sink));
    info!(
        listeners = bus.listener_count(launchpad_bus::topics::JOBS_CLONE),
        "deploy log recorder attached"
    );

    let supervisor_handle = tokio::spawn(async move {
        let mut lost = 0u64;
        while let Some(failure) = failures.recv().await {
            lost += 1;
            error!(
                topic = %failure.topic,
                app = %failure.app,
                error = %failure.error,
                lost,
                "deploy event lost"
            );
        }
    });

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper = Sweeper::new(Arc::new(store));
    let sweeper_handle = tokio::spawn(async move {
        sweeper.run(interval, shutdown_rx).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to install CTRL+C handler")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = sweeper_handle.await;
    // Dropping the bus drops the recorder and closes the failure channel.
    drop(bus);
    let _ = supervisor_handle.await;

    info!("Launchpad daemon stopped");
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
