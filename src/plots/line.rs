//! Line chart with Douglas-Peucker simplification.
//!
//! Renders one or more series into a viewport of a shared framebuffer, so
//! several charts can be stacked into a single dashboard frame. Long
//! unbounded histories are simplified before rasterization.
//!
//! # References
//!
//! - Douglas, D. H., & Peucker, T. K. (1973). "Algorithms for the reduction of
//!   the number of points required to represent a digitized line or its caricature."
//!   Cartographica, 10(2), 112-122.
//! - Wu, X. (1991). "An Efficient Antialiasing Technique." SIGGRAPH '91.

use crate::color::Rgba;
use crate::error::{Error, Result};
use crate::framebuffer::Framebuffer;
use crate::geometry::{Point, Rect};
use crate::render::{draw_line, draw_line_aa, draw_point};
use crate::scale::{extent, LinearScale, Scale};

// ============================================================================
// Douglas-Peucker Line Simplification
// ============================================================================

/// Simplify a polyline using the Douglas-Peucker algorithm.
///
/// This algorithm recursively decimates a curve composed of line segments to a
/// similar curve with fewer points. The simplification threshold (epsilon) determines
/// the maximum allowed perpendicular distance from the simplified line to points
/// in the original curve.
///
/// # Arguments
///
/// * `points` - The original points
/// * `epsilon` - Maximum perpendicular distance threshold (in pixels)
///
/// # Returns
///
/// A simplified list of points
///
/// # References
///
/// Douglas, D. H., & Peucker, T. K. (1973).
pub fn douglas_peucker(points: &[Point], epsilon: f32) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    // Find the point with the maximum distance from the line segment
    let (max_distance, max_index) = find_max_distance(points);

    // If max distance is greater than epsilon, recursively simplify
    if max_distance > epsilon {
        // Recursive call on both halves
        let left = douglas_peucker(&points[..=max_index], epsilon);
        let right = douglas_peucker(&points[max_index..], epsilon);

        // Combine results, avoiding duplicate of the split point
        let mut result = left;
        result.extend_from_slice(&right[1..]);
        result
    } else {
        // Return just the endpoints (safe: we checked len >= 3 above)
        vec![points[0], points[points.len() - 1]]
    }
}

/// Find the point with maximum perpendicular distance from the line between first and last points.
fn find_max_distance(points: &[Point]) -> (f32, usize) {
    let first = points[0];
    let last = points[points.len() - 1];

    let mut max_distance = 0.0;
    let mut max_index = 0;

    for (i, point) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let distance = perpendicular_distance(*point, first, last);
        if distance > max_distance {
            max_distance = distance;
            max_index = i;
        }
    }

    (max_distance, max_index)
}

/// Calculate perpendicular distance from a point to a line segment.
fn perpendicular_distance(point: Point, line_start: Point, line_end: Point) -> f32 {
    let dx = line_end.x - line_start.x;
    let dy = line_end.y - line_start.y;

    // Handle degenerate case (line_start == line_end)
    let line_length_sq = dx * dx + dy * dy;
    if line_length_sq < f32::EPSILON {
        return point.distance(line_start);
    }

    // Calculate perpendicular distance using cross product formula
    let numerator =
        ((dy * point.x) - (dx * point.y) + (line_end.x * line_start.y)
            - (line_end.y * line_start.x))
            .abs();
    let denominator = line_length_sq.sqrt();

    numerator / denominator
}

// ============================================================================
// Line Series
// ============================================================================

/// A data series for line charts.
#[derive(Debug, Clone)]
pub struct LineSeries {
    /// Series name/label.
    pub name: String,
    /// X-axis data.
    pub x_data: Vec<f32>,
    /// Y-axis data.
    pub y_data: Vec<f32>,
    /// Line color.
    pub color: Rgba,
    /// Use anti-aliasing.
    pub antialiased: bool,
}

impl LineSeries {
    /// Create a new line series.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            x_data: Vec::new(),
            y_data: Vec::new(),
            color: Rgba::BLUE,
            antialiased: true,
        }
    }

    /// Set the x and y data.
    #[must_use]
    pub fn data(mut self, x: &[f32], y: &[f32]) -> Self {
        self.x_data = x.to_vec();
        self.y_data = y.to_vec();
        self
    }

    /// Set y data against its index (0, 1, 2, ...).
    #[must_use]
    pub fn indexed(mut self, y: &[f32]) -> Self {
        self.x_data = (0..y.len()).map(|i| i as f32).collect();
        self.y_data = y.to_vec();
        self
    }

    /// Set the line color.
    #[must_use]
    pub fn color(mut self, color: Rgba) -> Self {
        self.color = color;
        self
    }

    /// Enable or disable anti-aliasing.
    #[must_use]
    pub fn antialiased(mut self, enabled: bool) -> Self {
        self.antialiased = enabled;
        self
    }

    /// Get the number of points.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.x_data.len().min(self.y_data.len())
    }
}

// ============================================================================
// Line Chart
// ============================================================================

/// Scales a chart used for its plot area, for drawing overlays on top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotFrame {
    /// Plot area inside the margin.
    pub area: Rect,
    /// Data x to pixel x.
    pub x_scale: LinearScale,
    /// Data y to pixel y (inverted: larger values are higher).
    pub y_scale: LinearScale,
}

/// Builder for creating line charts.
#[derive(Debug, Clone)]
pub struct LineChart {
    /// Data series.
    series: Vec<LineSeries>,
    /// Margin around the plot.
    margin: u32,
    /// Douglas-Peucker simplification epsilon (0 = disabled).
    simplify_epsilon: f32,
    /// Fixed x domain instead of the data extent.
    x_domain: Option<(f32, f32)>,
    /// Point size used when a series has a single point.
    point_size: f32,
}

impl Default for LineChart {
    fn default() -> Self {
        Self::new()
    }
}

impl LineChart {
    /// Create a new line chart builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            series: Vec::new(),
            margin: 40,
            simplify_epsilon: 0.0,
            x_domain: None,
            point_size: 4.0,
        }
    }

    /// Add a data series.
    #[must_use]
    pub fn add_series(mut self, series: LineSeries) -> Self {
        self.series.push(series);
        self
    }

    /// Add data as a single series (convenience method).
    #[must_use]
    pub fn data(self, x: &[f32], y: &[f32]) -> Self {
        let series = LineSeries::new("default").data(x, y);
        self.add_series(series)
    }

    /// Set the margin around the plot.
    #[must_use]
    pub fn margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    /// Enable Douglas-Peucker simplification.
    ///
    /// Larger epsilon values produce more aggressive simplification; 0
    /// disables it.
    #[must_use]
    pub fn simplify(mut self, epsilon: f32) -> Self {
        self.simplify_epsilon = epsilon.max(0.0);
        self
    }

    /// Pin the x domain, e.g. so that overlays share it across charts.
    #[must_use]
    pub fn x_domain(mut self, min: f32, max: f32) -> Self {
        self.x_domain = Some((min, max));
        self
    }

    /// Set the point size used for single-point series.
    #[must_use]
    pub fn point_size(mut self, size: f32) -> Self {
        self.point_size = size.max(1.0);
        self
    }

    /// Build and validate the line chart.
    ///
    /// # Errors
    ///
    /// Returns an error if no data series or data is empty.
    pub fn build(self) -> Result<Self> {
        if self.series.is_empty() {
            return Err(Error::EmptyData);
        }

        for series in &self.series {
            if series.x_data.is_empty() || series.y_data.is_empty() {
                return Err(Error::EmptyData);
            }

            if series.x_data.len() != series.y_data.len() {
                return Err(Error::DataLengthMismatch {
                    x_len: series.x_data.len(),
                    y_len: series.y_data.len(),
                });
            }
        }

        Ok(self)
    }

    /// Get the data extent across all series.
    fn data_extent(&self) -> Option<((f32, f32), (f32, f32))> {
        let xs: Vec<f32> = self.series.iter().flat_map(|s| s.x_data.iter().copied()).collect();
        let ys: Vec<f32> = self.series.iter().flat_map(|s| s.y_data.iter().copied()).collect();
        let x = match self.x_domain {
            Some(domain) => domain,
            None => extent(&xs)?,
        };
        Some((x, extent(&ys)?))
    }

    /// Computes the plot area and scales for `area`.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no data or the area is too small for the margin.
    pub fn frame(&self, area: Rect) -> Result<PlotFrame> {
        let ((x_min, x_max), (y_min, y_max)) = self.data_extent().ok_or(Error::EmptyData)?;

        let plot = area.inset(self.margin as f32);
        if plot.width < 1.0 || plot.height < 1.0 {
            return Err(Error::InvalidDimensions {
                width: area.width as u32,
                height: area.height as u32,
            });
        }

        let x_scale = LinearScale::padded((x_min, x_max), (plot.x, plot.right()))?;
        let y_scale = LinearScale::padded((y_min, y_max), (plot.bottom(), plot.y))?;

        Ok(PlotFrame { area: plot, x_scale, y_scale })
    }

    /// Render the chart into `area` of an existing framebuffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the chart has no data or `area` is too small.
    pub fn render_in(&self, fb: &mut Framebuffer, area: Rect) -> Result<PlotFrame> {
        let frame = self.frame(area)?;

        for series in &self.series {
            self.render_series(fb, series, &frame);
        }

        Ok(frame)
    }

    /// Render a single series.
    fn render_series(&self, fb: &mut Framebuffer, series: &LineSeries, frame: &PlotFrame) {
        let mut points: Vec<Point> = series
            .x_data
            .iter()
            .zip(&series.y_data)
            .map(|(&x, &y)| Point::new(frame.x_scale.scale(x), frame.y_scale.scale(y)))
            .collect();

        if let [only] = points.as_slice() {
            draw_point(fb, only.x, only.y, self.point_size, series.color);
            return;
        }

        if self.simplify_epsilon > 0.0 {
            points = douglas_peucker(&points, self.simplify_epsilon);
        }

        for pair in points.windows(2) {
            let (p1, p2) = (pair[0], pair[1]);
            if series.antialiased {
                draw_line_aa(fb, p1.x, p1.y, p2.x, p2.y, series.color);
            } else {
                draw_line(fb, p1.x as i32, p1.y as i32, p2.x as i32, p2.y as i32, series.color);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
