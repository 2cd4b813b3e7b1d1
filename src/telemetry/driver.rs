//! Periodic sampling driver.
//!
//! One tick is: sample, append, snapshot, present. Sampling happens outside
//! the series lock; only the append and the snapshot hold it, so marker
//! requests from other threads never wait on the external command.

use crate::telemetry::error::TelemetryError;
use crate::telemetry::sampler::Sampler;
use crate::telemetry::series::{lock_series, SharedSeries};
use crate::telemetry::sink::{finish_all, present_all, RenderSink, Snapshot};
use crate::telemetry::types::Metric;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep while waiting for the next tick.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Result of a single tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// A sample was appended and presented as this frame number.
    Rendered(u64),
    /// Nothing was appended.
    Skipped(TelemetryError),
}

impl TickOutcome {
    /// Returns true if the tick appended a sample.
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }
}

/// Tick counters reported by [`Driver::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Ticks that appended a sample.
    pub rendered: u64,
    /// Ticks skipped on a sampling error.
    pub skipped: u64,
}

/// Drives a sampler into a shared series and a set of sinks.
pub struct Driver {
    sampler: Arc<dyn Sampler>,
    series: SharedSeries,
    sinks: Vec<Box<dyn RenderSink>>,
    interval: Duration,
    rolling_window: usize,
    view_points: Option<usize>,
    next_frame: u64,
}

impl Driver {
    /// Default tick interval.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    /// Default number of samples behind the temperature delta.
    pub const DEFAULT_ROLLING_WINDOW: usize = 10;

    /// Creates a driver with no sinks.
    #[must_use]
    pub fn new(sampler: Arc<dyn Sampler>, series: SharedSeries) -> Self {
        Self {
            sampler,
            series,
            sinks: Vec::new(),
            interval: Self::DEFAULT_INTERVAL,
            rolling_window: Self::DEFAULT_ROLLING_WINDOW,
            view_points: None,
            next_frame: 0,
        }
    }

    /// Sets the tick interval.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the window used for the temperature delta.
    #[must_use]
    pub fn rolling_window(mut self, window: usize) -> Self {
        self.rolling_window = window;
        self
    }

    /// Caps the number of points in each snapshot.
    #[must_use]
    pub fn view_points(mut self, points: Option<usize>) -> Self {
        self.view_points = points;
        self
    }

    /// Adds a sink. Sinks are presented in insertion order.
    #[must_use]
    pub fn sink(mut self, sink: Box<dyn RenderSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// The series this driver appends to.
    #[must_use]
    pub fn series(&self) -> &SharedSeries {
        &self.series
    }

    /// Number of ticks that appended a sample so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.next_frame
    }

    /// Runs one tick.
    ///
    /// Sampling and append failures skip the tick. Sink failures are logged
    /// and do not undo the append. A sample stamped before the last appended
    /// one, e.g. after the wall clock steps back, takes the last timestamp.
    pub fn tick(&mut self) -> TickOutcome {
        let mut sample = match self.sampler.sample() {
            Ok(sample) => sample,
            Err(e) => return self.skip(e),
        };

        let snapshot = {
            let mut store = lock_series(&self.series);
            if let Some(last) = store.latest().map(|s| s.captured_at) {
                if sample.captured_at < last {
                    warn!(
                        "clock went back {}ms, stamping sample at {}",
                        (last - sample.captured_at).num_milliseconds(),
                        last.to_rfc3339()
                    );
                    sample.captured_at = last;
                }
            }
            if let Err(e) = store.append(sample.clone()) {
                drop(store);
                return self.skip(e);
            }
            Snapshot {
                frame: self.next_frame,
                view: store.window_view(self.view_points),
                temperature_delta: store.rolling_delta(Metric::Temperature, self.rolling_window),
                latest: sample,
            }
        };
        self.next_frame += 1;

        present_all(&mut self.sinks, &snapshot);
        TickOutcome::Rendered(snapshot.frame)
    }

    /// Ticks at a fixed rate until `shutdown` is set, then finishes every sink.
    ///
    /// A tick that overruns the interval delays the schedule instead of
    /// triggering a burst of catch-up ticks.
    pub fn run(&mut self, shutdown: &AtomicBool) -> RunStats {
        info!(
            "sampling {} every {:?} (delta window {})",
            self.sampler.describe(),
            self.interval,
            self.rolling_window
        );

        let mut stats = RunStats::default();
        let mut next = Instant::now();
        while !shutdown.load(Ordering::Relaxed) {
            match self.tick() {
                TickOutcome::Rendered(frame) => {
                    stats.rendered += 1;
                    debug!("frame #{} presented", frame);
                }
                TickOutcome::Skipped(_) => stats.skipped += 1,
            }

            next += self.interval;
            let now = Instant::now();
            if next < now {
                next = now;
            }
            sleep_until(next, shutdown);
        }

        info!("stopping after {} frames ({} skipped ticks)", stats.rendered, stats.skipped);
        self.finish();
        stats
    }

    /// Flushes every sink. Failures are logged.
    pub fn finish(&mut self) {
        finish_all(&mut self.sinks);
    }

    fn skip(&self, e: TelemetryError) -> TickOutcome {
        if e.is_per_tick() {
            warn!("tick skipped ({}): {}", self.sampler.describe(), e);
        } else {
            error!("tick skipped ({}): {}", self.sampler.describe(), e);
        }
        TickOutcome::Skipped(e)
    }
}

fn sleep_until(deadline: Instant, shutdown: &AtomicBool) {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(SHUTDOWN_POLL));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::parser::fixtures::{canonical, report};
    use crate::telemetry::sampler::ReplaySampler;
    use crate::telemetry::series::fixtures::{at, sample_at};
    use crate::telemetry::sink::fixtures::RecordingSink;
    use crate::telemetry::types::Sample;
    use crate::telemetry::SeriesStore;
    use approx::assert_relative_eq;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex;

    fn replay(reports: Vec<String>) -> Arc<dyn Sampler> {
        Arc::new(ReplaySampler::new(reports))
    }

    /// Hands out prepared results in order.
    struct ScriptedSampler(Mutex<VecDeque<crate::telemetry::error::Result<Sample>>>);

    impl ScriptedSampler {
        fn new(results: Vec<crate::telemetry::error::Result<Sample>>) -> Arc<dyn Sampler> {
            Arc::new(Self(Mutex::new(results.into())))
        }
    }

    impl Sampler for ScriptedSampler {
        fn sample(&self) -> crate::telemetry::error::Result<Sample> {
            self.0.lock().unwrap().pop_front().unwrap_or(Err(TelemetryError::ParseNotFound))
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    #[test]
    fn test_tick_appends_and_presents() {
        let recorder = RecordingSink::default();
        let series = SeriesStore::unbounded().shared();
        let mut driver = Driver::new(replay(vec![canonical()]), series.clone())
            .sink(Box::new(recorder.clone()));

        assert!(matches!(driver.tick(), TickOutcome::Rendered(0)));
        assert!(matches!(driver.tick(), TickOutcome::Rendered(1)));

        assert_eq!(lock_series(&series).len(), 2);
        let frames = recorder.frames.lock().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].view.len(), 2);
        assert_relative_eq!(frames[1].latest.temperature.value(), 65.0);
    }

    #[test]
    fn test_bad_report_skips_tick() {
        let recorder = RecordingSink::default();
        let series = SeriesStore::unbounded().shared();
        let reports = vec![canonical(), "garbage".to_string(), canonical()];
        let mut driver =
            Driver::new(replay(reports), series.clone()).sink(Box::new(recorder.clone()));

        assert!(driver.tick().is_rendered());
        assert!(matches!(driver.tick(), TickOutcome::Skipped(TelemetryError::ParseNotFound)));
        assert!(matches!(driver.tick(), TickOutcome::Rendered(1)));

        assert_eq!(lock_series(&series).len(), 2);
        assert_eq!(recorder.frames.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_snapshot_carries_temperature_delta() {
        let recorder = RecordingSink::default();
        let reports = ["40C", "42C", "44C"]
            .iter()
            .map(|t| report(t, "100W", "1024MiB", "10%"))
            .collect();
        let mut driver = Driver::new(replay(reports), SeriesStore::unbounded().shared())
            .rolling_window(3)
            .sink(Box::new(recorder.clone()));

        for _ in 0..3 {
            driver.tick();
        }

        let frames = recorder.frames.lock().unwrap();
        assert_relative_eq!(frames[0].temperature_delta, 0.0);
        assert_relative_eq!(frames[2].temperature_delta, 4.0);
    }

    #[test]
    fn test_view_points_cap_snapshot() {
        let recorder = RecordingSink::default();
        let mut driver = Driver::new(replay(vec![canonical()]), SeriesStore::unbounded().shared())
            .view_points(Some(2))
            .sink(Box::new(recorder.clone()));

        for _ in 0..5 {
            driver.tick();
        }

        let frames = recorder.frames.lock().unwrap();
        assert_eq!(frames[4].view.len(), 2);
        assert_eq!(driver.frames(), 5);
    }

    #[test]
    fn test_run_stops_on_shutdown_and_finishes_sinks() {
        let recorder = RecordingSink::default();
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut driver = Driver::new(replay(vec![canonical()]), SeriesStore::unbounded().shared())
            .interval(Duration::from_millis(10))
            .sink(Box::new(recorder.clone()));

        let flag = Arc::clone(&shutdown);
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            flag.store(true, Ordering::Relaxed);
        });

        let stats = driver.run(&shutdown);
        stopper.join().unwrap();

        assert!(stats.rendered >= 1, "expected at least one tick, got {:?}", stats);
        assert_eq!(stats.skipped, 0);
        assert!(*recorder.finished.lock().unwrap());
    }

    #[test]
    fn test_run_with_shutdown_already_set() {
        let recorder = RecordingSink::default();
        let mut driver = Driver::new(replay(vec![canonical()]), SeriesStore::unbounded().shared())
            .sink(Box::new(recorder.clone()));

        let stats = driver.run(&AtomicBool::new(true));

        assert_eq!(stats, RunStats::default());
        assert!(*recorder.finished.lock().unwrap());
    }

    #[test]
    fn test_clock_stepping_back_reuses_last_timestamp() {
        let series = SeriesStore::unbounded().shared();
        let sampler = ScriptedSampler::new(vec![
            Ok(sample_at(3600, 60.0)),
            Ok(sample_at(0, 61.0)),
            Ok(sample_at(5, 62.0)),
            Ok(sample_at(3601, 63.0)),
        ]);
        let mut driver = Driver::new(sampler, series.clone());

        for frame in 0..4 {
            assert!(matches!(driver.tick(), TickOutcome::Rendered(f) if f == frame));
        }

        let store = lock_series(&series);
        assert_eq!(store.len(), 4);
        let stamps = store.window_view(None).captured_at;
        assert_eq!(stamps, vec![at(3600), at(3600), at(3600), at(3601)]);
        assert_relative_eq!(store.latest().unwrap().temperature.value(), 63.0);
    }

    #[test]
    fn test_non_per_tick_error_still_skips() {
        let sampler = ScriptedSampler::new(vec![
            Err(TelemetryError::Io(io::Error::other("disk gone"))),
            Ok(sample_at(0, 60.0)),
        ]);
        let mut driver = Driver::new(sampler, SeriesStore::unbounded().shared());

        let outcome = driver.tick();
        assert!(matches!(&outcome, TickOutcome::Skipped(e) if !e.is_per_tick()));
        assert!(matches!(driver.tick(), TickOutcome::Rendered(0)));
    }
}
