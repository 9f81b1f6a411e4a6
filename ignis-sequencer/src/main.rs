//! Ignis sequencer - hotfire autosequence host
//!
//! Loads the launch file, connects to the stand (or the simulator) and runs
//! the countdown until an operator shutdown.

use std::path::PathBuf;

use clap::Parser;
use embassy_executor::{SpawnError, Spawner};
use embassy_sync::mutex::Mutex;
use static_cell::StaticCell;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use ignis_sequencer::archive::WallClock;
use ignis_sequencer::config::ConfigSource;
use ignis_sequencer::log::SessionLog;
use ignis_sequencer::stand::Stand;
use ignis_sequencer::channels::SHUTDOWN_SIGNAL;
use ignis_sequencer::tasks::{self, now_ms, SharedController};
use ignis_sequencer::{console, Controller, StartupError};

/// ignis-sequencer - test stand autosequencer
#[derive(Parser, Debug)]
#[command(name = "ignis-sequencer")]
#[command(version, about, long_about = None)]
struct Args {
    /// Launch file (defaults to the compiled-in launch.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stand command/telemetry link, host:port
    #[arg(long, conflicts_with = "simulate", required_unless_present = "simulate")]
    connect: Option<String>,

    /// Drive the in-memory simulated stand
    #[arg(long)]
    simulate: bool,

    /// Directory for the session log and record archive
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

static CONTROLLER: StaticCell<SharedController> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Ignis sequencer starting...");

    let controller: &'static SharedController = match startup(&args) {
        Ok(controller) => CONTROLLER.init(Mutex::new(controller)),
        Err(e) => {
            error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = spawn_tasks(&spawner, controller) {
        error!("Task spawn failed: {:?}", e);
        std::process::exit(1);
    }
    info!("All tasks spawned, sequencer running");

    // The sequencer ends the session; the other tasks die with the process
    SHUTDOWN_SIGNAL.wait().await;
    info!("Session shut down");
    std::process::exit(0);
}

/// Everything that must succeed before the first tick
fn startup(args: &Args) -> Result<Controller, StartupError> {
    let source = ConfigSource::from_arg(args.config.clone());
    let config = source.load()?;
    info!(
        "Configuration loaded: session {}, {} events",
        config.name,
        config.events.len()
    );

    let log = SessionLog::create(&args.log_dir, &config.name).map_err(|source| {
        StartupError::LogDir {
            path: args.log_dir.clone(),
            source,
        }
    })?;

    let stand = match &args.connect {
        Some(addr) => Stand::connect(addr, config.points.clone())?,
        None => Stand::simulated(config.points.clone()),
    };
    console::spawn()?;

    let now = now_ms();
    let wall = WallClock::new(now, chrono::Utc::now());
    let controller = Controller::new(&config, source, stand, log, now)?
        .with_archive(args.log_dir.clone(), wall);

    if controller.session().interlocks().conditions().is_empty() {
        warn!("No interlocks configured");
    }
    Ok(controller)
}

fn spawn_tasks(spawner: &Spawner, controller: &'static SharedController) -> Result<(), SpawnError> {
    spawner.spawn(tasks::tick_task())?;
    spawner.spawn(tasks::feed_task(controller))?;
    spawner.spawn(tasks::interlock_task(controller))?;
    spawner.spawn(tasks::release_task(controller))?;
    spawner.spawn(tasks::sequencer_task(controller))?;
    Ok(())
}
