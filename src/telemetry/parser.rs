//! Telemetry extraction from the diagnostic tool's tabular text report.
//!
//! The report has no stable schema: column widths and header wording shift
//! between driver versions. Extraction therefore anchors on three adjacent
//! rows that every version prints for the first device:
//!
//! ```text
//! |===============================+======================+======================|
//! |   0  NVIDIA GeForce ...  Off  | 00000000:01:00.0  On |                  N/A |
//! | 30%   65C    P2   120W / 250W |   2048MiB /  8192MiB |     37%      Default |
//! ```
//!
//! Border runs (`---`, `-+-`) and `|` separators are stripped first, leaving
//! whitespace-separated tokens. A scan over the tokenized lines then walks
//! `SeekingSeparator -> SeekingIndexRow -> ExpectMetricsRow` and extracts
//! the four measurements by column position from the metrics row.

use crate::telemetry::error::{Result, TelemetryError};
use crate::telemetry::types::{Measurement, MemoryUnit, Metric, Sample};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::RangeInclusive;

static DECORATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]{2,}|[|+]").expect("decoration pattern is valid"));

/// Token that identifies the first device's row.
const FIRST_DEVICE_INDEX: &str = "0";

/// Device name starts right after the index.
const DEVICE_NAME_COLUMN: usize = 1;

/// Metrics row columns: `Fan Temp Perf Pwr / Cap Used / Total Util Compute`.
const TEMPERATURE_COLUMN: usize = 1;
const POWER_COLUMN: usize = 3;
const MEMORY_COLUMN: usize = 6;

const PERCENT: RangeInclusive<f64> = 0.0..=100.0;
const NON_NEGATIVE: RangeInclusive<f64> = 0.0..=f64::MAX;

/// Scanner state over tokenized lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Looking for a header separator row (`====`).
    SeekingSeparator,
    /// The previous row was a separator; expecting the device `0` row.
    SeekingIndexRow,
    /// The previous row was device `0`; this row carries its metrics.
    ExpectMetricsRow {
        /// Line index of the device row.
        device_row: usize,
    },
}

impl ScanState {
    fn next(self, index: usize, tokens: &[&str]) -> Self {
        match self {
            Self::SeekingSeparator | Self::SeekingIndexRow if is_separator_row(tokens) => {
                Self::SeekingIndexRow
            }
            Self::SeekingIndexRow if tokens.first() == Some(&FIRST_DEVICE_INDEX) => {
                Self::ExpectMetricsRow { device_row: index }
            }
            _ => Self::SeekingSeparator,
        }
    }
}

/// Parses a report, stamping the sample with the current time.
///
/// # Errors
///
/// Returns [`TelemetryError::ParseNotFound`] when the anchor rows are absent,
/// [`TelemetryError::UnknownUnit`] for an unrecognized memory suffix, and
/// [`TelemetryError::InvalidNumber`] / [`TelemetryError::MissingField`] when
/// the metrics row cannot be read.
pub fn parse(raw: &str) -> Result<Sample> {
    parse_at(raw, Utc::now())
}

/// Parses a report with an explicit capture timestamp.
///
/// # Errors
///
/// Same as [`parse`].
pub fn parse_at(raw: &str, captured_at: DateTime<Utc>) -> Result<Sample> {
    let cleaned = strip_decoration(raw);
    let lines = tokenize(&cleaned);

    let mut state = ScanState::SeekingSeparator;
    for (index, tokens) in lines.iter().enumerate() {
        if let ScanState::ExpectMetricsRow { device_row } = state {
            return extract(&lines[device_row], tokens, captured_at);
        }
        state = state.next(index, tokens);
    }

    Err(TelemetryError::ParseNotFound)
}

/// Replaces border runs and column separators with spaces.
fn strip_decoration(raw: &str) -> String {
    DECORATION.replace_all(raw, " ").into_owned()
}

/// Splits text into non-empty lines of whitespace-separated tokens.
fn tokenize(text: &str) -> Vec<Vec<&str>> {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .filter(|tokens| !tokens.is_empty())
        .collect()
}

fn is_separator_row(tokens: &[&str]) -> bool {
    tokens.iter().any(|token| token.len() > 3 && token.chars().all(|c| c == '='))
}

fn extract(
    device_row: &[&str],
    metrics_row: &[&str],
    captured_at: DateTime<Utc>,
) -> Result<Sample> {
    let device_name = device_name(device_row)?;

    let temperature =
        unit_value(metrics_row, TEMPERATURE_COLUMN, 'C', "temperature", f64::MIN..=f64::MAX)?;
    let power = unit_value(metrics_row, POWER_COLUMN, 'W', "power", NON_NEGATIVE)?;
    let (memory, memory_unit) = memory_value(metrics_row)?;
    let utilization_column =
        metrics_row.len().checked_sub(2).ok_or(TelemetryError::MissingField("utilization"))?;
    let utilization =
        unit_value(metrics_row, utilization_column, '%', "utilization", PERCENT)?;

    Ok(Sample {
        device_name,
        temperature: Measurement::new(temperature, "C", Metric::Temperature.label()),
        power: Measurement::new(power, "W", Metric::Power.label()),
        memory_used: Measurement::new(memory, memory_unit.suffix(), Metric::MemoryUsed.label()),
        utilization: Measurement::new(utilization, "%", Metric::Utilization.label()),
        captured_at,
    })
}

/// The name runs from its column up to the persistence-mode flag, when present.
fn device_name(device_row: &[&str]) -> Result<String> {
    let rest = device_row.get(DEVICE_NAME_COLUMN..).unwrap_or_default();
    let end = rest.iter().position(|t| matches!(*t, "On" | "Off")).unwrap_or(rest.len().min(1));
    if end == 0 {
        return Err(TelemetryError::MissingField("device name"));
    }
    Ok(rest[..end].join(" "))
}

fn unit_value(
    row: &[&str],
    column: usize,
    unit: char,
    field: &'static str,
    valid: RangeInclusive<f64>,
) -> Result<f64> {
    let token = row.get(column).copied().ok_or(TelemetryError::MissingField(field))?;
    let number = token.strip_suffix(unit).unwrap_or(token);
    parse_number(number, token, field, &valid)
}

fn memory_value(row: &[&str]) -> Result<(f64, MemoryUnit)> {
    let token = row.get(MEMORY_COLUMN).copied().ok_or(TelemetryError::MissingField("memory"))?;
    let (number, unit) = MemoryUnit::split_token(token)
        .ok_or_else(|| TelemetryError::UnknownUnit(token.to_string()))?;
    Ok((parse_number(number, token, "memory", &NON_NEGATIVE)?, unit))
}

fn parse_number(
    number: &str,
    token: &str,
    field: &'static str,
    valid: &RangeInclusive<f64>,
) -> Result<f64> {
    number
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && valid.contains(value))
        .ok_or_else(|| TelemetryError::InvalidNumber { field, token: token.to_string() })
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Builds a report in the classic driver layout with injected values.
    pub fn report(temp: &str, power: &str, memory: &str, util: &str) -> String {
        format!(
            "Thu Oct 16 10:00:00 2026\n\
+-----------------------------------------------------------------------------+\n\
| NVIDIA-SMI 535.104.05   Driver Version: 535.104.05   CUDA Version: 12.2     |\n\
|-------------------------------+----------------------+----------------------+\n\
| GPU  Name        Persistence-M| Bus-Id        Disp.A | Volatile Uncorr. ECC |\n\
| Fan  Temp  Perf  Pwr:Usage/Cap|         Memory-Usage | GPU-Util  Compute M. |\n\
|                               |                      |               MIG M. |\n\
|===============================+======================+======================|\n\
|   0  NVIDIA GeForce RTX 3070  Off | 00000000:01:00.0  On |                  N/A |\n\
| 30%   {temp}    P2   {power} / 250W |   {memory} /  8192MiB |     {util}      Default |\n\
|                               |                      |                  N/A |\n\
+-------------------------------+----------------------+----------------------+\n\
\n\
+-----------------------------------------------------------------------------+\n\
| Processes:                                                                  |\n\
|  GPU   GI   CI        PID   Type   Process name                  GPU Memory |\n\
|=============================================================================|\n\
|    0   N/A  N/A      1234      G   /usr/lib/xorg/Xorg                 4MiB |\n\
+-----------------------------------------------------------------------------+\n"
        )
    }

    /// The canonical report used across tests: 65C, 120W, 2048MiB, 37%.
    pub fn canonical() -> String {
        report("65C", "120W", "2048MiB", "37%")
    }
}
