//! Core telemetry types.
//!
//! - [`Measurement`]: an immutable value/unit/label triple
//! - [`MemoryUnit`]: the binary byte magnitudes a memory reading may carry
//! - [`Metric`]: the four tracked metrics, used to address projections
//! - [`Sample`]: one complete snapshot of the first device

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// A single reading with its unit and a human-readable label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    value: f64,
    unit: String,
    label: String,
}

impl Measurement {
    /// Creates a new measurement.
    #[must_use]
    pub fn new(value: f64, unit: impl Into<String>, label: impl Into<String>) -> Self {
        Self { value, unit: unit.into(), label: label.into() }
    }

    /// The numeric value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The unit symbol (`C`, `W`, `MiB`, `%`, ...).
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The display label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.label, self.value, self.unit)
    }
}

/// Binary byte-magnitude units, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MemoryUnit {
    /// 2^10 bytes.
    KiB,
    /// 2^20 bytes.
    MiB,
    /// 2^30 bytes.
    GiB,
    /// 2^40 bytes.
    TiB,
    /// 2^50 bytes.
    PiB,
    /// 2^60 bytes.
    EiB,
    /// 2^70 bytes.
    ZiB,
    /// 2^80 bytes.
    YiB,
}

impl MemoryUnit {
    /// All units, smallest first.
    pub const ALL: [Self; 8] = [
        Self::KiB,
        Self::MiB,
        Self::GiB,
        Self::TiB,
        Self::PiB,
        Self::EiB,
        Self::ZiB,
        Self::YiB,
    ];

    /// The textual suffix as printed by the diagnostic tool.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::KiB => "KiB",
            Self::MiB => "MiB",
            Self::GiB => "GiB",
            Self::TiB => "TiB",
            Self::PiB => "PiB",
            Self::EiB => "EiB",
            Self::ZiB => "ZiB",
            Self::YiB => "YiB",
        }
    }

    /// Looks up a unit by its exact suffix.
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|unit| unit.suffix() == suffix)
    }

    /// Splits a token such as `2048MiB` into its numeric part and unit.
    #[must_use]
    pub fn split_token(token: &str) -> Option<(&str, Self)> {
        Self::ALL
            .into_iter()
            .find_map(|unit| token.strip_suffix(unit.suffix()).map(|number| (number, unit)))
    }

    /// Power of 1024 this unit represents.
    #[must_use]
    pub fn exponent(self) -> i32 {
        self as i32 + 1
    }

    /// Converts `value` expressed in `self` into `target` units.
    #[must_use]
    pub fn convert(self, value: f64, target: Self) -> f64 {
        value * 1024f64.powi(self.exponent() - target.exponent())
    }
}

impl fmt::Display for MemoryUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// The four tracked metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// GPU temperature in degrees Celsius.
    Temperature,
    /// Power draw in watts.
    Power,
    /// Framebuffer memory in use.
    MemoryUsed,
    /// GPU utilization percentage.
    Utilization,
}

impl Metric {
    /// All metrics in display order.
    pub const ALL: [Self; 4] =
        [Self::Temperature, Self::Power, Self::MemoryUsed, Self::Utilization];

    /// Stable lowercase identifier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Power => "power",
            Self::MemoryUsed => "memory_used",
            Self::Utilization => "utilization",
        }
    }

    /// Human-readable label attached to extracted measurements.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Power => "Power Usage",
            Self::MemoryUsed => "Memory Usage",
            Self::Utilization => "GPU Utilization",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One telemetry snapshot of the first reported device.
///
/// Either all four measurements are present or no `Sample` exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Device model name.
    pub device_name: String,
    /// Temperature (unit `C`).
    pub temperature: Measurement,
    /// Power draw (unit `W`).
    pub power: Measurement,
    /// Memory used (unit is a [`MemoryUnit`] suffix).
    pub memory_used: Measurement,
    /// Utilization (unit `%`).
    pub utilization: Measurement,
    /// When the report was extracted.
    pub captured_at: DateTime<Utc>,
}

impl Sample {
    /// Returns the measurement for `metric`.
    #[must_use]
    pub fn measurement(&self, metric: Metric) -> &Measurement {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Power => &self.power,
            Metric::MemoryUsed => &self.memory_used,
            Metric::Utilization => &self.utilization,
        }
    }

    /// Unit of the memory reading.
    #[must_use]
    pub fn memory_unit(&self) -> Option<MemoryUnit> {
        MemoryUnit::from_suffix(self.memory_used.unit())
    }

    /// Value of `metric`, with memory converted into `memory_unit`.
    #[must_use]
    pub fn value_in(&self, metric: Metric, memory_unit: MemoryUnit) -> f64 {
        let value = self.measurement(metric).value();
        match (metric, self.memory_unit()) {
            (Metric::MemoryUsed, Some(unit)) => unit.convert(value, memory_unit),
            _ => value,
        }
    }
}
