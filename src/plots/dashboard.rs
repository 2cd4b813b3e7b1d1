//! Telemetry dashboard frame.
//!
//! Layout, top to bottom:
//!
//! - a rate-of-change bar for temperature, growing right (warming) or left
//!   (cooling) from the center, its color shifting with the magnitude
//! - four stacked line panels in [`Metric::ALL`] order
//!
//! Event markers are drawn as dashed vertical lines across every panel at the
//! sample they were recorded on.

use crate::color::{Palette, Rgba};
use crate::error::{Error, Result};
use crate::framebuffer::Framebuffer;
use crate::geometry::Rect;
use crate::plots::line::{LineChart, LineSeries};
use crate::render::{draw_rect, draw_rect_outline, draw_vline_dashed};
use crate::scale::Scale;
use crate::telemetry::{Metric, WindowView};

/// Temperature delta (C) at which the bar reaches full length.
pub const DELTA_FULL_SCALE: f64 = 10.0;

/// Smallest frame the layout fits into.
pub const MIN_WIDTH: u32 = 120;
/// Smallest frame the layout fits into.
pub const MIN_HEIGHT: u32 = 120;

const OUTER_PADDING: f32 = 8.0;
const PANEL_GAP: f32 = 6.0;
const BAR_HEIGHT: f32 = 24.0;
const PANEL_MARGIN: u32 = 4;
const MARKER_DASH: u32 = 3;

/// Renders [`WindowView`] snapshots into dashboard frames.
#[derive(Debug, Clone)]
pub struct Dashboard {
    width: u32,
    height: u32,
    palette: Palette,
    simplify_epsilon: f32,
}

impl Dashboard {
    /// Creates a dashboard renderer for frames of `width` x `height`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] below [`MIN_WIDTH`] x [`MIN_HEIGHT`].
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width < MIN_WIDTH || height < MIN_HEIGHT {
            return Err(Error::InvalidDimensions { width, height });
        }
        Ok(Self { width, height, palette: Palette::default(), simplify_epsilon: 0.5 })
    }

    /// Sets the color palette.
    #[must_use]
    pub fn palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Sets the Douglas-Peucker epsilon for long series (0 disables).
    #[must_use]
    pub fn simplify(mut self, epsilon: f32) -> Self {
        self.simplify_epsilon = epsilon.max(0.0);
        self
    }

    /// Frame width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The delta bar strip and the four panel areas.
    #[must_use]
    pub fn layout(&self) -> (Rect, Vec<Rect>) {
        let inner = Rect::new(0.0, 0.0, self.width as f32, self.height as f32).inset(OUTER_PADDING);
        let (bar, rest) = inner.split_top(BAR_HEIGHT);
        let (_, panels) = rest.split_top(PANEL_GAP);
        (bar, panels.rows(Metric::ALL.len(), PANEL_GAP))
    }

    /// Renders one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if a panel cannot be laid out.
    pub fn render(&self, view: &WindowView, temperature_delta: f64) -> Result<Framebuffer> {
        let mut fb = Framebuffer::new(self.width, self.height)?;
        fb.clear(self.palette.background);

        let (bar, panels) = self.layout();
        self.render_delta_bar(&mut fb, bar, temperature_delta);

        let markers = view.marker_positions();
        for (metric, area) in Metric::ALL.into_iter().zip(panels) {
            self.render_panel(&mut fb, area, view, metric, &markers)?;
        }

        Ok(fb)
    }

    fn render_panel(
        &self,
        fb: &mut Framebuffer,
        area: Rect,
        view: &WindowView,
        metric: Metric,
        markers: &[usize],
    ) -> Result<()> {
        fill(fb, area, self.palette.panel);
        draw_rect_outline(
            fb,
            area.x as i32,
            area.y as i32,
            area.width as u32,
            area.height as u32,
            self.palette.axis,
            1,
        );

        let values: Vec<f32> = view.values(metric).iter().map(|&v| v as f32).collect();
        if values.is_empty() {
            return Ok(());
        }

        let last_index = (values.len() - 1) as f32;
        let chart = LineChart::new()
            .add_series(
                LineSeries::new(metric.name()).indexed(&values).color(self.palette.metric(metric)),
            )
            .margin(PANEL_MARGIN)
            .simplify(self.simplify_epsilon)
            .x_domain(0.0, last_index);
        let frame = chart.frame(area)?;

        for &index in markers {
            let x = frame.x_scale.scale(index as f32).round() as i32;
            draw_vline_dashed(
                fb,
                x,
                frame.area.y as i32,
                frame.area.bottom() as i32,
                MARKER_DASH,
                self.palette.marker,
            );
        }

        chart.render_in(fb, area)?;
        Ok(())
    }

    fn render_delta_bar(&self, fb: &mut Framebuffer, area: Rect, delta: f64) {
        fill(fb, area, self.palette.panel);

        let track = area.inset(3.0);
        let center = track.x + track.width / 2.0;
        let (length, color) = delta_bar(delta, track.width / 2.0, &self.palette);

        let (left, width) = if delta >= 0.0 { (center, length) } else { (center - length, length) };
        draw_rect(
            fb,
            left as i32,
            track.y as i32,
            width.max(1.0) as u32,
            track.height as u32,
            color,
        );

        // Zero line.
        let (top, bottom) = (area.y as i32, area.bottom() as i32);
        draw_vline_dashed(fb, center as i32, top, bottom, 0, self.palette.axis);
    }
}

/// Bar length (0..=`half_width`) and color for a temperature delta.
///
/// Non-finite deltas render as an empty, steady bar.
#[must_use]
pub fn delta_bar(delta: f64, half_width: f32, palette: &Palette) -> (f32, Rgba) {
    if !delta.is_finite() || delta == 0.0 {
        return (0.0, palette.steady);
    }
    let t = (delta.abs() / DELTA_FULL_SCALE).min(1.0) as f32;
    let target = if delta > 0.0 { palette.warming } else { palette.cooling };
    (t * half_width, palette.steady.lerp(target, t))
}

fn fill(fb: &mut Framebuffer, area: Rect, color: Rgba) {
    draw_rect(fb, area.x as i32, area.y as i32, area.width as u32, area.height as u32, color);
}
