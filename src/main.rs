//! Binary entrypoint for the photo wall.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use photo_wall::config::{Configuration, SourceMode};
use photo_wall::handles::HandleRegistry;
use photo_wall::region::RegionLock;
use photo_wall::sources::folder::FolderSource;
use photo_wall::surface::DisplaySurface;
use photo_wall::tasks::supply;
use photo_wall::tasks::wall::WallScheduler;
use photo_wall::tracker::AvailabilityTracker;

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "photo-wall", about = "Rotating media wall engine")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Override the highlight hold duration (e.g. 10s)
    #[arg(long, value_name = "DURATION")]
    hold: Option<humantime::Duration>,

    /// Deterministic selection seed (overrides rotation.selection-seed)
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("photo_wall={}", level).parse().unwrap());
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = Configuration::from_yaml_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    if let Some(hold) = cli.hold {
        cfg.animation.hold = hold.into();
    }
    if let Some(seed) = cli.seed {
        cfg.rotation.selection_seed = Some(seed);
    }
    let cfg = cfg.validated().context("invalid configuration values")?;
    info!(
        "loaded configuration from {}:\n{:#?}",
        cli.config.display(),
        cfg
    );

    let source = Arc::new(FolderSource::new(&cfg.source.library_path));
    let tracker = Arc::new(AvailabilityTracker::new(cfg.rotation.selection_seed));
    let surface = Arc::new(DisplaySurface::new(cfg.viewport(), cfg.surface.lanes));
    let regions = Arc::new(RegionLock::new(
        cfg.regions.buffer_margin,
        cfg.regions.retry_delay,
    ));
    let handles = Arc::new(HandleRegistry::new());
    let scheduler = Arc::new(WallScheduler::new(
        cfg.clone(),
        Arc::clone(&source),
        Arc::clone(&tracker),
        Arc::clone(&surface),
        Arc::clone(&regions),
        Arc::clone(&handles),
    ));

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Feed supply
    tasks.spawn({
        let source = Arc::clone(&source);
        let tracker = Arc::clone(&tracker);
        let surface = Arc::clone(&surface);
        let cancel = cancel.clone();
        let mode = cfg.source.mode;
        let poll_interval = cfg.source.poll_interval;
        async move {
            match mode {
                SourceMode::Watch => supply::run_push(source, tracker, surface, cancel)
                    .await
                    .context("supply task failed"),
                SourceMode::Poll => supply::run_poll(source, tracker, poll_interval, cancel)
                    .await
                    .context("supply task failed"),
            }
        }
    });

    // Wall rotation
    tasks.spawn({
        let scheduler = Arc::clone(&scheduler);
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await.context("wall task failed") }
    });

    // Status heartbeat
    tasks.spawn({
        let tracker = Arc::clone(&tracker);
        let surface = Arc::clone(&surface);
        let handles = Arc::clone(&handles);
        let scheduler = Arc::clone(&scheduler);
        let cancel = cancel.clone();
        async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(Duration::from_secs(30)) => {}
                }
                let snap = tracker.snapshot();
                let lanes: Vec<usize> = (0..surface.lane_count())
                    .map(|lane| surface.lane_elements(lane).len())
                    .collect();
                info!(
                    pending = snap.pending.len(),
                    available = snap.available.len(),
                    in_flight = snap.in_flight.len(),
                    live_handles = handles.live(),
                    cycles = scheduler.cycles_completed(),
                    lanes = ?lanes,
                    "wall status"
                );
            }
        }
    });

    // First fatal task error brings the rest down.
    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("task error: {e:?}");
                cancel.cancel();
            }
            Err(e) => {
                error!("join error: {e}");
                cancel.cancel();
            }
        }
    }

    Ok(())
}
