//! Colors and the dashboard palette.

use crate::telemetry::Metric;

/// RGBA color with 8-bit components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct Rgba {
    /// Red component (0-255).
    pub r: u8,
    /// Green component (0-255).
    pub g: u8,
    /// Blue component (0-255).
    pub b: u8,
    /// Alpha component (0-255, 255 = fully opaque).
    pub a: u8,
}

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    /// Opaque red.
    pub const RED: Self = Self::new(255, 0, 0, 255);
    /// Opaque green.
    pub const GREEN: Self = Self::new(0, 255, 0, 255);
    /// Opaque blue.
    pub const BLUE: Self = Self::new(0, 0, 255, 255);

    /// Create a new RGBA color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque RGB color (alpha = 255).
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Create a color with modified alpha.
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    /// Convert to array representation.
    #[must_use]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Create from array representation.
    #[must_use]
    pub const fn from_array(arr: [u8; 4]) -> Self {
        Self::new(arr[0], arr[1], arr[2], arr[3])
    }

    /// Linear interpolation between two colors.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let inv_t = 1.0 - t;

        Self::new(
            (f32::from(self.r) * inv_t + f32::from(other.r) * t) as u8,
            (f32::from(self.g) * inv_t + f32::from(other.g) * t) as u8,
            (f32::from(self.b) * inv_t + f32::from(other.b) * t) as u8,
            (f32::from(self.a) * inv_t + f32::from(other.a) * t) as u8,
        )
    }
}

/// Colors used by the telemetry dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Frame background.
    pub background: Rgba,
    /// Panel background.
    pub panel: Rgba,
    /// Panel border and axis lines.
    pub axis: Rgba,
    /// Event marker lines.
    pub marker: Rgba,
    /// Delta bar when the temperature is steady.
    pub steady: Rgba,
    /// Delta bar when the temperature is rising.
    pub warming: Rgba,
    /// Delta bar when the temperature is falling.
    pub cooling: Rgba,
    /// Series colors in [`Metric::ALL`] order.
    pub series: [Rgba; 4],
}

impl Palette {
    /// Light palette (default).
    pub const LIGHT: Self = Self {
        background: Rgba::WHITE,
        panel: Rgba::rgb(248, 248, 250),
        axis: Rgba::rgb(180, 180, 190),
        marker: Rgba::rgb(120, 120, 120),
        steady: Rgba::rgb(160, 160, 160),
        warming: Rgba::rgb(214, 39, 40),
        cooling: Rgba::rgb(31, 119, 180),
        series: [
            Rgba::rgb(214, 39, 40),
            Rgba::rgb(255, 127, 14),
            Rgba::rgb(44, 160, 44),
            Rgba::rgb(148, 103, 189),
        ],
    };

    /// Dark palette.
    pub const DARK: Self = Self {
        background: Rgba::rgb(24, 24, 28),
        panel: Rgba::rgb(34, 34, 40),
        axis: Rgba::rgb(80, 80, 92),
        marker: Rgba::rgb(200, 200, 200),
        steady: Rgba::rgb(110, 110, 110),
        warming: Rgba::rgb(255, 85, 85),
        cooling: Rgba::rgb(98, 174, 239),
        series: [
            Rgba::rgb(255, 85, 85),
            Rgba::rgb(255, 184, 108),
            Rgba::rgb(80, 250, 123),
            Rgba::rgb(189, 147, 249),
        ],
    };

    /// Line color for `metric`.
    #[must_use]
    pub fn metric(&self, metric: Metric) -> Rgba {
        let index = Metric::ALL.iter().position(|m| *m == metric).unwrap_or(0);
        self.series[index]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::LIGHT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_constants() {
        assert_eq!(Rgba::BLACK, Rgba::rgb(0, 0, 0));
        assert_eq!(Rgba::WHITE, Rgba::rgb(255, 255, 255));
        assert_eq!(Rgba::RED.r, 255);
        assert_eq!(Rgba::GREEN.g, 255);
        assert_eq!(Rgba::BLUE.b, 255);
    }

    #[test]
    fn test_rgba_lerp() {
        let mid = Rgba::BLACK.lerp(Rgba::WHITE, 0.5);
        assert_eq!(mid.r, 127);
        assert_eq!(mid.g, 127);
        assert_eq!(mid.b, 127);
    }

    #[test]
    fn test_rgba_lerp_clamps() {
        assert_eq!(Rgba::BLACK.lerp(Rgba::WHITE, 2.0), Rgba::WHITE);
        assert_eq!(Rgba::BLACK.lerp(Rgba::WHITE, -1.0), Rgba::BLACK);
    }

    #[test]
    fn test_array_round_trip() {
        let color = Rgba::new(1, 2, 3, 4);
        assert_eq!(Rgba::from_array(color.to_array()), color);
    }

    #[test]
    fn test_palette_metric_colors_are_distinct() {
        let palette = Palette::default();
        for (i, a) in Metric::ALL.iter().enumerate() {
            for b in &Metric::ALL[i + 1..] {
                assert_ne!(palette.metric(*a), palette.metric(*b), "{a} and {b} share a color");
            }
        }
    }
}
