//! Plot types used to draw telemetry frames.

mod dashboard;
mod line;

pub use dashboard::{delta_bar, Dashboard, DELTA_FULL_SCALE, MIN_HEIGHT, MIN_WIDTH};
pub use line::{douglas_peucker, LineChart, LineSeries, PlotFrame};
