//! smi-viz - live GPU telemetry dashboard.
//!
//! Samples `nvidia-smi` on a fixed interval and renders each tick to the log,
//! to dated PNG frames and/or to an animated PNG. Type a line on stdin to
//! drop an event marker; `q` quits.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{error, info, warn};
use smi_viz::plots::Dashboard;
use smi_viz::telemetry::{
    lock_series, AnimationSink, ApiServer, ChannelSink, CommandSampler, Config, Driver,
    FrameSink, LogSink, RenderSink, ReplaySampler, Sampler, SeriesStore, SharedSeries,
};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Snapshots queued for the render thread before new ones are dropped.
const RENDER_QUEUE_DEPTH: usize = 8;

/// smi-viz: live GPU telemetry dashboard
#[derive(Parser, Debug)]
#[command(name = "smi-viz")]
#[command(author = "PAIML Team")]
#[command(version)]
#[command(about = "Sample nvidia-smi and render a live telemetry dashboard", long_about = None)]
struct Cli {
    /// Config file path (defaults to <config dir>/smi-viz/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds between samples
    #[arg(short, long)]
    interval: Option<u64>,

    /// Diagnostic command to run
    #[arg(long)]
    command: Option<String>,

    /// Replay captured reports instead of running the command
    #[arg(long, num_args = 1.., value_name = "FILE")]
    replay: Vec<PathBuf>,

    /// Keep at most this many samples
    #[arg(long)]
    max_samples: Option<usize>,

    /// Samples behind the temperature rate-of-change
    #[arg(short, long)]
    window: Option<usize>,

    /// Write one PNG per tick under this directory
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Write an animated PNG of the run to this file
    #[arg(long)]
    video: Option<PathBuf>,

    /// Finalize the animation after this many frames
    #[arg(long)]
    frame_budget: Option<usize>,

    /// Serve GET /v1/metrics on this address
    #[arg(long, value_name = "ADDR")]
    serve: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    // Must run before any other thread is spawned.
    #[cfg(unix)]
    let signal = chan_signal::notify(&[chan_signal::Signal::INT, chan_signal::Signal::TERM]);

    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let config = load_config(&cli)?;
    let shutdown = Arc::new(AtomicBool::new(false));

    #[cfg(unix)]
    {
        let shutdown = Arc::clone(&shutdown);
        thread::Builder::new().name("smi-viz-signal".to_string()).spawn(move || {
            if let Some(sig) = signal.recv() {
                info!("received {:?}, shutting down", sig);
                shutdown.store(true, Ordering::Relaxed);
            }
        })?;
    }

    let sampler: Arc<dyn Sampler> = if cli.replay.is_empty() {
        Arc::new(CommandSampler::from_config(&config.sampler))
    } else {
        Arc::new(ReplaySampler::from_files(&cli.replay).context("failed to load replay reports")?)
    };
    let series = SeriesStore::new(config.series.retention()).shared();

    let mut driver = Driver::new(Arc::clone(&sampler), Arc::clone(&series))
        .interval(config.driver.interval())
        .rolling_window(config.driver.rolling_window)
        .view_points(config.series.view_points)
        .sink(Box::new(LogSink));

    let file_sinks = build_file_sinks(&config)?;
    if !file_sinks.is_empty() {
        driver = driver.sink(Box::new(ChannelSink::spawn(file_sinks, RENDER_QUEUE_DEPTH)?));
    }

    let api = match &config.http.bind {
        Some(bind) => Some(
            ApiServer::spawn(bind, Arc::clone(&sampler), Arc::clone(&shutdown))
                .context("failed to start http probe")?,
        ),
        None => None,
    };

    spawn_input(Arc::clone(&series), Arc::clone(&shutdown))?;

    let stats = driver.run(&shutdown);
    shutdown.store(true, Ordering::Relaxed);
    if let Some(api) = api {
        api.join();
    }

    info!("done: {} frames, {} skipped ticks", stats.rendered, stats.skipped);
    Ok(())
}

fn setup_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                Utc::now().to_rfc3339(),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .context("could not set up logging")
}

/// File config first, then command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => match Config::default_path().filter(|path| path.is_file()) {
            Some(path) => Config::load(&path)?,
            None => Config::default(),
        },
    };

    if let Some(interval) = cli.interval {
        config.driver.interval_secs = interval;
    }
    if let Some(command) = &cli.command {
        config.sampler.command.clone_from(command);
    }
    if cli.max_samples.is_some() {
        config.series.max_samples = cli.max_samples;
    }
    if let Some(window) = cli.window {
        config.driver.rolling_window = window;
    }
    if cli.frames_dir.is_some() {
        config.export.frames_dir.clone_from(&cli.frames_dir);
    }
    if cli.video.is_some() {
        config.export.video_path.clone_from(&cli.video);
    }
    if cli.frame_budget.is_some() {
        config.export.frame_budget = cli.frame_budget;
    }
    if cli.serve.is_some() {
        config.http.bind.clone_from(&cli.serve);
    }

    config.validate()?;
    Ok(config)
}

fn build_file_sinks(config: &Config) -> Result<Vec<Box<dyn RenderSink>>> {
    let export = &config.export;
    let mut sinks: Vec<Box<dyn RenderSink>> = Vec::new();
    if export.frames_dir.is_none() && export.video_path.is_none() {
        return Ok(sinks);
    }

    let dashboard = Dashboard::new(export.width, export.height)?;
    if let Some(dir) = &export.frames_dir {
        let sink = FrameSink::create(dashboard.clone(), dir)
            .with_context(|| format!("cannot create frames directory {}", dir.display()))?;
        info!("writing frames under {}", dir.display());
        sinks.push(Box::new(sink));
    }
    if let Some(path) = &export.video_path {
        let sink = AnimationSink::create(dashboard, path, export.video_fps, export.frame_budget)
            .with_context(|| format!("cannot prepare animation {}", path.display()))?;
        info!("recording animation to {}", path.display());
        sinks.push(Box::new(sink));
    }
    Ok(sinks)
}

/// Each stdin line drops an event marker; `q` or `quit` stops the run.
fn spawn_input(series: SharedSeries, shutdown: Arc<AtomicBool>) -> Result<()> {
    thread::Builder::new().name("smi-viz-input".to_string()).spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("stdin closed: {}", e);
                    return;
                }
            };
            if matches!(line.trim(), "q" | "quit") {
                shutdown.store(true, Ordering::Relaxed);
                return;
            }
            match lock_series(&series).mark_event() {
                Ok(at) => info!("event marker at {}", at.to_rfc3339()),
                Err(e) => error!("cannot mark event: {}", e),
            }
        }
    })?;
    Ok(())
}
