//! Render sinks: where per-tick snapshots go.
//!
//! The driver never hands sinks a reference into the series. Each tick
//! produces an immutable [`Snapshot`] that sinks consume; [`ChannelSink`]
//! moves it to a render thread so encoding frames never delays sampling.

use crate::output::{AnimationEncoder, FrameWriter};
use crate::plots::Dashboard;
use crate::telemetry::error::{Result, TelemetryError};
use crate::telemetry::series::WindowView;
use crate::telemetry::types::Sample;
use log::{debug, info, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

/// Everything a sink needs to draw one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Zero-based count of successful ticks.
    pub frame: u64,
    /// Point-in-time copy of the series.
    pub view: WindowView,
    /// Rolling temperature delta over the driver's window.
    pub temperature_delta: f64,
    /// The sample appended on this tick.
    pub latest: Sample,
}

/// Consumer of per-tick snapshots.
pub trait RenderSink: Send {
    /// Short name for log lines.
    fn name(&self) -> &'static str;

    /// Handles one snapshot.
    ///
    /// # Errors
    ///
    /// Implementations report failures; the driver logs them and carries on.
    fn present(&mut self, snapshot: &Snapshot) -> Result<()>;

    /// Flushes pending output at shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if pending output could not be written.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Logs one summary line per snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl RenderSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn present(&mut self, snapshot: &Snapshot) -> Result<()> {
        let s = &snapshot.latest;
        info!(
            "#{} {}: {} | {} | {} | {} | rate {:+.2}C ({} pts, {} markers)",
            snapshot.frame,
            s.device_name,
            s.temperature,
            s.power,
            s.memory_used,
            s.utilization,
            snapshot.temperature_delta,
            snapshot.view.len(),
            snapshot.view.markers.len(),
        );
        Ok(())
    }
}

/// Renders the dashboard and writes one numbered PNG per snapshot.
#[derive(Debug)]
pub struct FrameSink {
    dashboard: Dashboard,
    writer: FrameWriter,
}

impl FrameSink {
    /// Creates the frames directory.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Render`] if the directory cannot be created.
    pub fn create(dashboard: Dashboard, dir: impl Into<PathBuf>) -> Result<Self> {
        let writer = FrameWriter::create(dir)?;
        Ok(Self { dashboard, writer })
    }

    /// Frames directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.writer.root()
    }
}

impl RenderSink for FrameSink {
    fn name(&self) -> &'static str {
        "frames"
    }

    fn present(&mut self, snapshot: &Snapshot) -> Result<()> {
        let fb = self.dashboard.render(&snapshot.view, snapshot.temperature_delta)?;
        let path = self.writer.write(&fb, snapshot.latest.captured_at)?;
        debug!("wrote {}", path.display());
        Ok(())
    }
}

/// Accumulates dashboard frames into an animated PNG.
///
/// The file is written once: at [`RenderSink::finish`], or as soon as the
/// frame budget is reached. Snapshots after that are ignored.
#[derive(Debug)]
pub struct AnimationSink {
    dashboard: Dashboard,
    encoder: AnimationEncoder,
    path: PathBuf,
    budget: Option<usize>,
    finalized: bool,
}

impl AnimationSink {
    /// Creates a sink writing to `path` at `fps`.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Render`] for unusable dimensions, or
    /// [`TelemetryError::Io`] if the parent directory cannot be created.
    pub fn create(
        dashboard: Dashboard,
        path: impl Into<PathBuf>,
        fps: u16,
        budget: Option<usize>,
    ) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let encoder = AnimationEncoder::new(dashboard.width(), dashboard.height(), fps)?;
        Ok(Self { dashboard, encoder, path, budget, finalized: false })
    }

    /// Returns true once the animation file has been written.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Number of frames accumulated so far.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.encoder.len()
    }

    fn finalize(&mut self) -> Result<()> {
        self.finalized = true;
        if self.encoder.is_empty() {
            info!("no frames captured, skipping {}", self.path.display());
            return Ok(());
        }
        self.encoder.write_to_file(&self.path)?;
        info!(
            "wrote {} frames at {} fps to {}",
            self.encoder.len(),
            self.encoder.fps(),
            self.path.display()
        );
        Ok(())
    }
}

impl RenderSink for AnimationSink {
    fn name(&self) -> &'static str {
        "animation"
    }

    fn present(&mut self, snapshot: &Snapshot) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        let fb = self.dashboard.render(&snapshot.view, snapshot.temperature_delta)?;
        self.encoder.push(&fb)?;

        if self.budget.is_some_and(|budget| self.encoder.len() >= budget) {
            self.finalize()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalize()
    }
}

/// Drains snapshots from a channel into its sinks until the sender closes.
pub struct RenderWorker {
    sinks: Vec<Box<dyn RenderSink>>,
}

impl RenderWorker {
    /// Creates a worker over `sinks`.
    #[must_use]
    pub fn new(sinks: Vec<Box<dyn RenderSink>>) -> Self {
        Self { sinks }
    }

    /// Presents every received snapshot, then finishes all sinks.
    pub fn run(mut self, snapshots: Receiver<Snapshot>) {
        for snapshot in snapshots {
            present_all(&mut self.sinks, &snapshot);
        }
        finish_all(&mut self.sinks);
    }
}

/// Forwards snapshots to a [`RenderWorker`] on its own thread.
///
/// The queue is bounded: when the render thread falls behind, new snapshots
/// are dropped with a warning rather than delaying the next sample.
pub struct ChannelSink {
    sender: Option<SyncSender<Snapshot>>,
    worker: Option<JoinHandle<()>>,
    dropped: u64,
}

impl ChannelSink {
    /// Starts the render thread with a queue of `depth` snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Io`] if the thread cannot be spawned.
    pub fn spawn(sinks: Vec<Box<dyn RenderSink>>, depth: usize) -> Result<Self> {
        let (sender, receiver) = mpsc::sync_channel(depth.max(1));
        let worker = RenderWorker::new(sinks);
        let handle = thread::Builder::new()
            .name("smi-viz-render".to_string())
            .spawn(move || worker.run(receiver))?;
        Ok(Self { sender: Some(sender), worker: Some(handle), dropped: 0 })
    }

    /// Snapshots dropped because the render thread was behind.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl RenderSink for ChannelSink {
    fn name(&self) -> &'static str {
        "render-thread"
    }

    fn present(&mut self, snapshot: &Snapshot) -> Result<()> {
        let Some(sender) = &self.sender else {
            return Err(worker_gone());
        };
        match sender.try_send(snapshot.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(dropped)) => {
                self.dropped += 1;
                warn!("render thread busy, dropping frame #{}", dropped.frame);
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(worker_gone()),
        }
    }

    fn finish(&mut self) -> Result<()> {
        drop(self.sender.take());
        if let Some(handle) = self.worker.take() {
            handle.join().map_err(|_| worker_gone())?;
        }
        Ok(())
    }
}

impl Drop for ChannelSink {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.finish();
        }
    }
}

fn worker_gone() -> TelemetryError {
    TelemetryError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "render thread has stopped"))
}

/// Presents `snapshot` to every sink, logging failures.
pub(crate) fn present_all(sinks: &mut [Box<dyn RenderSink>], snapshot: &Snapshot) {
    for sink in sinks.iter_mut() {
        if let Err(e) = sink.present(snapshot) {
            warn!("{} sink failed on frame #{}: {}", sink.name(), snapshot.frame, e);
        }
    }
}

/// Finishes every sink, logging failures.
pub(crate) fn finish_all(sinks: &mut [Box<dyn RenderSink>]) {
    for sink in sinks.iter_mut() {
        if let Err(e) = sink.finish() {
            warn!("{} sink failed to finish: {}", sink.name(), e);
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::{RenderSink, Snapshot};
    use crate::telemetry::error::Result;
    use std::sync::{Arc, Mutex};

    /// Records every snapshot it sees.
    #[derive(Debug, Default, Clone)]
    pub struct RecordingSink {
        pub frames: Arc<Mutex<Vec<Snapshot>>>,
        pub finished: Arc<Mutex<bool>>,
    }

    impl RenderSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn present(&mut self, snapshot: &Snapshot) -> Result<()> {
            self.frames.lock().unwrap().push(snapshot.clone());
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            *self.finished.lock().unwrap() = true;
            Ok(())
        }
    }
}
