//! GPU telemetry: sampling, parsing, history and delivery.
//!
//! ```text
//! Sampler ──► parser ──► Sample ──► SeriesStore ──► Snapshot ──► RenderSink(s)
//!    ▲                                  ▲
//!    └── http probe (no append)         └── mark_event (stdin)
//! ```
//!
//! The [`Driver`] owns the tick loop; everything else is usable on its own.

pub mod config;
pub mod driver;
pub mod error;
pub mod http;
pub mod parser;
pub mod ring_buffer;
pub mod sampler;
pub mod series;
pub mod sink;
pub mod subprocess;
pub mod types;

pub use config::Config;
pub use driver::{Driver, RunStats, TickOutcome};
pub use error::{ProcessFailure, Result, TelemetryError};
pub use http::{route, ApiResponse, ApiServer};
pub use parser::{parse, parse_at};
pub use ring_buffer::RingBuffer;
pub use sampler::{CommandSampler, ReplaySampler, Sampler};
pub use series::{lock_series, Retention, SeriesStore, SharedSeries, WindowView};
pub use sink::{AnimationSink, ChannelSink, FrameSink, LogSink, RenderSink, RenderWorker, Snapshot};
pub use types::{Measurement, MemoryUnit, Metric, Sample};
