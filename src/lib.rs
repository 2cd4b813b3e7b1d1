//! # smi-viz
//!
//! Live GPU telemetry from `nvidia-smi` text reports.
//!
//! smi-viz runs the diagnostic tool on a fixed interval, extracts the first
//! device's temperature, power draw, memory usage and utilization from the
//! human-readable table, keeps them as a time series with user event markers,
//! and renders each tick into a dashboard frame: four stacked line panels and
//! a temperature rate-of-change bar. Frames can be written as numbered PNGs,
//! accumulated into an animated PNG, or summarized to the log. A small HTTP
//! probe returns a fresh sample on demand.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smi_viz::prelude::*;
//! use std::sync::Arc;
//!
//! let sampler: Arc<dyn Sampler> = Arc::new(CommandSampler::default());
//! let series = SeriesStore::unbounded().shared();
//! let mut driver = Driver::new(sampler, series).sink(Box::new(LogSink));
//!
//! match driver.tick() {
//!     TickOutcome::Rendered(frame) => println!("frame {frame}"),
//!     TickOutcome::Skipped(e) => eprintln!("skipped: {e}"),
//! }
//! ```
//!
//! ## References
//!
//! - Wu, X. (1991). "An Efficient Antialiasing Technique." SIGGRAPH '91.
//! - Douglas, D. H., & Peucker, T. K. (1973). Line simplification algorithm.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only
#![cfg_attr(test, allow(clippy::unwrap_used))]
// Allow common patterns in graphics code
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Core Modules
// ============================================================================

/// Color types and dashboard palettes.
pub mod color;

/// Core framebuffer for pixel rendering.
pub mod framebuffer;

/// Geometric primitives (points, rectangles).
pub mod geometry;

/// Scale functions for data-to-pixel mappings.
pub mod scale;

// ============================================================================
// Rendering Modules
// ============================================================================

/// Line charts and the telemetry dashboard.
pub mod plots;

/// Rasterization primitives.
pub mod render;

/// Output encoders (PNG, frame directories, animated PNG).
pub mod output;

// ============================================================================
// Telemetry
// ============================================================================

/// Sampling, parsing, series storage, driver, sinks and HTTP probe.
pub mod telemetry;

// ============================================================================
// Error Types
// ============================================================================

/// Error types for rendering and encoding.
pub mod error;

pub use error::{Error, Result};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types and traits for convenient imports.
///
/// ```rust
/// use smi_viz::prelude::*;
/// ```
pub mod prelude {
    pub use crate::color::{Palette, Rgba};
    pub use crate::error::{Error, Result};
    pub use crate::framebuffer::Framebuffer;
    pub use crate::geometry::{Point, Rect};
    pub use crate::output::{AnimationEncoder, FrameWriter, PngEncoder};
    pub use crate::plots::{Dashboard, LineChart, LineSeries};
    pub use crate::scale::{LinearScale, Scale};
    pub use crate::telemetry::{
        CommandSampler, Config, Driver, LogSink, Metric, RenderSink, ReplaySampler, Sample,
        Sampler, SeriesStore, Snapshot, TelemetryError, TickOutcome, WindowView,
    };
}

// ============================================================================
// Re-exports
// ============================================================================

/// Re-export trueno for direct access to SIMD operations.
pub use trueno;
