//! Scale functions for data-to-pixel mappings.

use crate::error::{Error, Result};
use trueno::Vector;

/// Trait for scale functions that map domain values to range values.
pub trait Scale<D, R> {
    /// Transform a domain value to a range value.
    fn scale(&self, value: D) -> R;

    /// Get the domain extent.
    fn domain(&self) -> (D, D);

    /// Get the range extent.
    fn range(&self) -> (R, R);
}

const FLAT_PAD_RATIO: f32 = 1e-3;

/// Linear scale for continuous-to-continuous mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain_min: f32,
    domain_max: f32,
    range_min: f32,
    range_max: f32,
}

impl LinearScale {
    /// Create a new linear scale.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain is degenerate or not finite.
    pub fn new(domain: (f32, f32), range: (f32, f32)) -> Result<Self> {
        if !domain.0.is_finite() || !domain.1.is_finite() {
            return Err(Error::ScaleDomain("Domain bounds must be finite".to_string()));
        }
        if (domain.0 - domain.1).abs() < f32::EPSILON {
            return Err(Error::ScaleDomain("Domain min and max cannot be equal".to_string()));
        }

        Ok(Self {
            domain_min: domain.0,
            domain_max: domain.1,
            range_min: range.0,
            range_max: range.1,
        })
    }

    /// Create a scale over `domain`, widening it when it is flat.
    ///
    /// A flat domain grows by `max(1, |v| / 1000)` on each side so it renders
    /// as a centered line instead of failing. The relative term keeps the
    /// widening visible in `f32` for large values such as memory in KiB.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain is not finite.
    pub fn padded(domain: (f32, f32), range: (f32, f32)) -> Result<Self> {
        let (min, max) = domain;
        if (max - min).abs() < f32::EPSILON {
            let pad = (min.abs().max(max.abs()) * FLAT_PAD_RATIO).max(1.0);
            Self::new((min - pad, max + pad), range)
        } else {
            Self::new((min, max), range)
        }
    }
}

impl Scale<f32, f32> for LinearScale {
    fn scale(&self, value: f32) -> f32 {
        let t = (value - self.domain_min) / (self.domain_max - self.domain_min);
        self.range_min + t * (self.range_max - self.range_min)
    }

    fn domain(&self) -> (f32, f32) {
        (self.domain_min, self.domain_max)
    }

    fn range(&self) -> (f32, f32) {
        (self.range_min, self.range_max)
    }
}

/// Minimum and maximum of `data`, `None` when empty.
#[must_use]
pub fn extent(data: &[f32]) -> Option<(f32, f32)> {
    if data.is_empty() {
        return None;
    }
    let vector = Vector::from_slice(data);
    let min = vector.min().ok()?;
    let max = vector.max().ok()?;
    Some((min, max))
}
