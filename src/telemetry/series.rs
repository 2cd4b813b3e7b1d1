//! Append-only, time-indexed sample history with event markers.
//!
//! The store is owned explicitly and shared through [`SharedSeries`], a
//! mutex that serializes appends from the driver with marker requests from
//! user input. Readers take a [`WindowView`], a point-in-time copy that the
//! render path can hold without keeping the lock.

use crate::telemetry::error::{Result, TelemetryError};
use crate::telemetry::ring_buffer::RingBuffer;
use crate::telemetry::types::{MemoryUnit, Metric, Sample};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// How many samples the store keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    /// Keep every sample for the lifetime of the process.
    #[default]
    Unbounded,
    /// Keep at most this many samples, evicting the oldest.
    Bounded(usize),
}

impl Retention {
    /// Builds a retention policy from an optional sample cap.
    #[must_use]
    pub fn from_max_samples(max_samples: Option<usize>) -> Self {
        max_samples.map_or(Self::Unbounded, Self::Bounded)
    }
}

/// Read-only projection of the series for rendering.
///
/// All metric vectors are parallel to `captured_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowView {
    /// Device name of the latest sample.
    pub device_name: Option<String>,
    /// Capture timestamps, non-decreasing.
    pub captured_at: Vec<DateTime<Utc>>,
    /// Temperature values (C).
    pub temperature: Vec<f64>,
    /// Power values (W).
    pub power: Vec<f64>,
    /// Memory values, all expressed in `memory_unit`.
    pub memory_used: Vec<f64>,
    /// Unit of `memory_used` (unit of the latest sample).
    pub memory_unit: MemoryUnit,
    /// Utilization values (%).
    pub utilization: Vec<f64>,
    /// Event markers that fall inside the window.
    pub markers: Vec<DateTime<Utc>>,
}

impl WindowView {
    /// Number of points in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.captured_at.len()
    }

    /// Returns true if the window has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.captured_at.is_empty()
    }

    /// Values of one metric.
    #[must_use]
    pub fn values(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Power => &self.power,
            Metric::MemoryUsed => &self.memory_used,
            Metric::Utilization => &self.utilization,
        }
    }

    /// Point index each marker refers to.
    #[must_use]
    pub fn marker_positions(&self) -> Vec<usize> {
        self.markers
            .iter()
            .filter_map(|marker| {
                let index = self.captured_at.partition_point(|at| at < marker);
                (index < self.captured_at.len()).then_some(index)
            })
            .collect()
    }
}

/// Append-only sample history plus event markers.
#[derive(Debug, Clone, Default)]
pub struct SeriesStore {
    samples: RingBuffer<Sample>,
    markers: VecDeque<DateTime<Utc>>,
}

impl SeriesStore {
    /// Creates an empty store with the given retention.
    ///
    /// # Panics
    ///
    /// Panics if `retention` is `Bounded(0)`.
    #[must_use]
    pub fn new(retention: Retention) -> Self {
        let samples = match retention {
            Retention::Unbounded => RingBuffer::unbounded(),
            Retention::Bounded(max) => RingBuffer::bounded(max),
        };
        Self { samples, markers: VecDeque::new() }
    }

    /// Creates an unbounded store.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(Retention::Unbounded)
    }

    /// Wraps the store for sharing between the driver and input handlers.
    #[must_use]
    pub fn shared(self) -> SharedSeries {
        Arc::new(Mutex::new(self))
    }

    /// Appends a sample in arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::OutOfOrder`] if the sample is older than the
    /// last appended one; the store is left unchanged.
    pub fn append(&mut self, sample: Sample) -> Result<()> {
        if let Some(last) = self.samples.latest() {
            if sample.captured_at < last.captured_at {
                return Err(TelemetryError::OutOfOrder {
                    last: last.captured_at,
                    got: sample.captured_at,
                });
            }
        }

        if self.samples.push(sample).is_some() {
            self.evict_stale_markers();
        }
        Ok(())
    }

    /// Markers must reference a retained sample.
    fn evict_stale_markers(&mut self) {
        let Some(oldest) = self.samples.oldest().map(|s| s.captured_at) else {
            return;
        };
        while self.markers.front().is_some_and(|marker| *marker < oldest) {
            self.markers.pop_front();
        }
    }

    /// Records an event marker at the latest sample's timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::EmptySeries`] if nothing has been appended.
    pub fn mark_event(&mut self) -> Result<DateTime<Utc>> {
        let at = self.samples.latest().map(|s| s.captured_at).ok_or(TelemetryError::EmptySeries)?;
        self.markers.push_back(at);
        Ok(at)
    }

    /// Smoothed rate-of-change over the last `window` samples of `metric`.
    ///
    /// Computes `max(diffs) + min(diffs)` over the consecutive differences in
    /// the window, combining the steepest rise and the steepest fall into one
    /// signed figure. The window is clamped to the available samples. With
    /// fewer than two samples in the window the result is `0.0`.
    #[must_use]
    pub fn rolling_delta(&self, metric: Metric, window: usize) -> f64 {
        let unit = self.memory_unit();
        let values: Vec<f64> =
            self.samples.last_n(window).map(|s| s.value_in(metric, unit)).collect();

        let mut diffs = values.windows(2).map(|pair| pair[1] - pair[0]);
        let Some(first) = diffs.next() else {
            return 0.0;
        };
        let (min, max) = diffs.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        max + min
    }

    /// Snapshot of the latest `max_points` samples (all when `None`).
    ///
    /// Markers older than the first returned sample are omitted.
    #[must_use]
    pub fn window_view(&self, max_points: Option<usize>) -> WindowView {
        let take = max_points.unwrap_or(usize::MAX);
        let unit = self.memory_unit();
        let points: Vec<&Sample> = self.samples.last_n(take).collect();

        let project = |metric: Metric| -> Vec<f64> {
            points.iter().map(|s| s.value_in(metric, unit)).collect()
        };

        let markers = match points.first() {
            Some(first) => {
                self.markers.iter().filter(|m| **m >= first.captured_at).copied().collect()
            }
            None => Vec::new(),
        };

        WindowView {
            device_name: self.samples.latest().map(|s| s.device_name.clone()),
            captured_at: points.iter().map(|s| s.captured_at).collect(),
            temperature: project(Metric::Temperature),
            power: project(Metric::Power),
            memory_used: project(Metric::MemoryUsed),
            memory_unit: unit,
            utilization: project(Metric::Utilization),
            markers,
        }
    }

    /// Values of `metric` for every retained sample.
    #[must_use]
    pub fn metric_values(&self, metric: Metric) -> Vec<f64> {
        let unit = self.memory_unit();
        self.samples.iter().map(|s| s.value_in(metric, unit)).collect()
    }

    /// The most recently appended sample.
    #[must_use]
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.latest()
    }

    /// All retained markers, oldest first.
    pub fn markers(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.markers.iter()
    }

    /// Number of retained samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if no sample has been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Memory projections use the unit of the latest sample.
    fn memory_unit(&self) -> MemoryUnit {
        self.samples.latest().and_then(Sample::memory_unit).unwrap_or(MemoryUnit::MiB)
    }
}

/// Series store behind its mutual-exclusion boundary.
pub type SharedSeries = Arc<Mutex<SeriesStore>>;

/// Locks a shared series, recovering the data if a holder panicked.
///
/// Every mutation either fully applies or returns early, so the store is
/// consistent even after a poisoning panic.
pub fn lock_series(series: &SharedSeries) -> MutexGuard<'_, SeriesStore> {
    series.lock().unwrap_or_else(PoisonError::into_inner)
}


#[cfg(test)]
mod tests {
    use super::fixtures::{at, sample_at};
    use super::*;
    use crate::telemetry::types::Measurement;
    use approx::assert_relative_eq;

    fn store_with(temps: &[f64]) -> SeriesStore {
        let mut store = SeriesStore::unbounded();
        for (i, &t) in temps.iter().enumerate() {
            store.append(sample_at(i as i64, t)).unwrap();
        }
        store
    }

    #[test]
    fn test_rolling_delta_constant_step() {
        let store = store_with(&[40.0, 42.0, 44.0]);
        assert_relative_eq!(store.rolling_delta(Metric::Temperature, 3), 4.0);
    }

    #[test]
    fn test_rolling_delta_combines_rise_and_fall() {
        let store = store_with(&[50.0, 55.0, 52.0, 53.0]);
        // diffs [5, -3, 1] -> max 5 + min -3
        assert_relative_eq!(store.rolling_delta(Metric::Temperature, 4), 2.0);
    }

    #[test]
    fn test_rolling_delta_uses_only_window_tail() {
        let store = store_with(&[10.0, 90.0, 40.0, 42.0, 44.0]);
        assert_relative_eq!(store.rolling_delta(Metric::Temperature, 3), 4.0);
    }

    #[test]
    fn test_rolling_delta_window_clamped_to_available() {
        let store = store_with(&[40.0, 43.0]);
        assert_relative_eq!(store.rolling_delta(Metric::Temperature, 50), 6.0);
    }

    #[test]
    fn test_rolling_delta_fewer_than_two_is_zero() {
        assert_relative_eq!(SeriesStore::unbounded().rolling_delta(Metric::Temperature, 5), 0.0);
        let store = store_with(&[40.0]);
        assert_relative_eq!(store.rolling_delta(Metric::Temperature, 5), 0.0);
        let store = store_with(&[40.0, 60.0]);
        assert_relative_eq!(store.rolling_delta(Metric::Temperature, 1), 0.0);
    }

    #[test]
    fn test_mark_event_on_empty_series() {
        let mut store = SeriesStore::unbounded();
        assert!(matches!(store.mark_event(), Err(TelemetryError::EmptySeries)));
        assert_eq!(store.markers().count(), 0);
    }

    #[test]
    fn test_mark_event_uses_latest_timestamp() {
        let mut store = SeriesStore::unbounded();
        store.append(sample_at(0, 40.0)).unwrap();
        assert_eq!(store.mark_event().unwrap(), at(0));

        store.append(sample_at(5, 41.0)).unwrap();
        assert_eq!(store.mark_event().unwrap(), at(5));
        assert_eq!(store.markers().copied().collect::<Vec<_>>(), vec![at(0), at(5)]);
    }

    #[test]
    fn test_append_rejects_out_of_order() {
        let mut store = SeriesStore::unbounded();
        store.append(sample_at(10, 40.0)).unwrap();

        let result = store.append(sample_at(5, 41.0));

        assert!(matches!(result, Err(TelemetryError::OutOfOrder { .. })));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_append_accepts_equal_timestamps() {
        let mut store = SeriesStore::unbounded();
        store.append(sample_at(10, 40.0)).unwrap();
        store.append(sample_at(10, 41.0)).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_window_view_projections_are_parallel() {
        let store = store_with(&[40.0, 41.0, 42.0]);
        let view = store.window_view(None);

        assert_eq!(view.len(), 3);
        assert_eq!(view.temperature, vec![40.0, 41.0, 42.0]);
        assert_eq!(view.power, vec![140.0, 141.0, 142.0]);
        assert_eq!(view.memory_used.len(), 3);
        assert_eq!(view.utilization.len(), 3);
        assert_eq!(view.device_name.as_deref(), Some("Test GPU"));
    }

    #[test]
    fn test_window_view_caps_points_and_filters_markers() {
        let mut store = SeriesStore::unbounded();
        store.append(sample_at(0, 40.0)).unwrap();
        store.mark_event().unwrap();
        for i in 1..5 {
            store.append(sample_at(i, 40.0)).unwrap();
        }
        store.mark_event().unwrap();

        let view = store.window_view(Some(2));

        assert_eq!(view.captured_at, vec![at(3), at(4)]);
        assert_eq!(view.markers, vec![at(4)]);
        assert_eq!(view.marker_positions(), vec![1]);
        assert_eq!(store.markers().count(), 2, "markers outside the view are retained");
    }

    #[test]
    fn test_window_view_empty() {
        let view = SeriesStore::unbounded().window_view(None);
        assert!(view.is_empty());
        assert!(view.markers.is_empty());
        assert_eq!(view.device_name, None);
    }

    #[test]
    fn test_bounded_retention_evicts_samples_and_markers() {
        let mut store = SeriesStore::new(Retention::Bounded(3));
        store.append(sample_at(0, 40.0)).unwrap();
        store.mark_event().unwrap();
        store.append(sample_at(1, 41.0)).unwrap();
        store.mark_event().unwrap();

        for i in 2..5 {
            store.append(sample_at(i, 42.0)).unwrap();
        }

        assert_eq!(store.len(), 3);
        assert_eq!(store.markers().count(), 0, "markers of evicted samples are dropped");
        assert_eq!(store.window_view(None).captured_at, vec![at(2), at(3), at(4)]);
    }

    #[test]
    fn test_memory_projection_uses_latest_unit() {
        let mut store = SeriesStore::unbounded();
        store.append(sample_at(0, 40.0)).unwrap();
        let mut gib = sample_at(1, 40.0);
        gib.memory_used = Measurement::new(3.0, "GiB", "Memory Usage");
        store.append(gib).unwrap();

        let view = store.window_view(None);

        assert_eq!(view.memory_unit, MemoryUnit::GiB);
        assert_relative_eq!(view.memory_used[0], 2.0);
        assert_relative_eq!(view.memory_used[1], 3.0);
        assert_eq!(store.metric_values(Metric::MemoryUsed), view.memory_used);
        assert_relative_eq!(store.rolling_delta(Metric::MemoryUsed, 2), 2.0);
    }

    #[test]
    fn test_shared_series_serializes_access() {
        let shared = SeriesStore::unbounded().shared();
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let series = Arc::clone(&shared);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let mut guard = lock_series(&series);
                        let next = guard.latest().map_or(0, |s| s.captured_at.timestamp() + 1);
                        let mut s = sample_at(0, 40.0);
                        s.captured_at = chrono::DateTime::from_timestamp(next, 0).unwrap();
                        guard.append(s).unwrap();
                        let _ = guard.mark_event();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let store = lock_series(&shared);
        assert_eq!(store.len(), 100);
        assert_eq!(store.markers().count(), 100);
    }
}

#[cfg(test)]
mod proptests {
    use super::fixtures::sample_at;
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Whatever order samples arrive in, the retained index is non-decreasing.
        #[test]
        fn prop_index_non_decreasing(offsets in prop::collection::vec(0i64..100, 0..60)) {
            let mut store = SeriesStore::unbounded();
            for &offset in &offsets {
                let _ = store.append(sample_at(offset, 40.0));
            }

            let view = store.window_view(None);
            prop_assert!(view.captured_at.windows(2).all(|w| w[0] <= w[1]));
        }

        /// Markers always reference a retained sample timestamp.
        #[test]
        fn prop_markers_reference_retained_samples(
            capacity in 1usize..10,
            actions in prop::collection::vec(any::<bool>(), 0..80),
        ) {
            let mut store = SeriesStore::new(Retention::Bounded(capacity));
            let mut clock = 0;
            for mark in actions {
                if mark {
                    let _ = store.mark_event();
                } else {
                    store.append(sample_at(clock, 40.0)).unwrap();
                    clock += 1;
                }
            }

            let retained: Vec<_> = store.window_view(None).captured_at;
            for marker in store.markers() {
                prop_assert!(retained.contains(marker));
            }
        }

        /// Monotone step series yields twice the step.
        #[test]
        fn prop_constant_step_delta(start in 0i32..100, step in 1i32..10, len in 3usize..30) {
            let mut store = SeriesStore::unbounded();
            for i in 0..len {
                let t = f64::from(start) + f64::from(step) * i as f64;
                store.append(sample_at(i as i64, t)).unwrap();
            }

            let delta = store.rolling_delta(Metric::Temperature, len);
            prop_assert!((delta - 2.0 * f64::from(step)).abs() < 1e-9);
        }
    }
}
