//! Samplers: one call, one [`Sample`].
//!
//! [`Sampler`] is the seam between the periodic driver, the HTTP probe and
//! whatever produces report text. [`CommandSampler`] runs the diagnostic
//! tool; [`ReplaySampler`] cycles through captured reports for offline use.
//! Neither retries: retry and backoff belong to the caller.

use crate::telemetry::config::SamplerConfig;
use crate::telemetry::error::{ProcessFailure, Result, TelemetryError};
use crate::telemetry::parser;
use crate::telemetry::subprocess::{run_with_timeout, SubprocessResult};
use crate::telemetry::types::Sample;
use log::debug;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Produces one telemetry sample per call.
///
/// Implementations are shared between threads and must tolerate concurrent
/// callers.
pub trait Sampler: Send + Sync {
    /// Captures and parses one report.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Process`] when the report cannot be obtained
    /// and the parser's error unchanged when it cannot be read.
    fn sample(&self) -> Result<Sample>;

    /// Short description for log lines.
    fn describe(&self) -> String;
}

/// Samples by running the external diagnostic command.
///
/// Invocations are serialized: at most one child process exists at a time,
/// and concurrent callers queue on an internal gate.
#[derive(Debug)]
pub struct CommandSampler {
    command: String,
    args: Vec<String>,
    timeout: Duration,
    gate: Mutex<()>,
}

impl CommandSampler {
    /// Default diagnostic executable.
    pub const DEFAULT_COMMAND: &'static str = "nvidia-smi";

    /// Default upper bound on a single invocation.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a sampler for `command` with no arguments.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            timeout: Self::DEFAULT_TIMEOUT,
            gate: Mutex::new(()),
        }
    }

    /// Creates a sampler from configuration.
    #[must_use]
    pub fn from_config(config: &SamplerConfig) -> Self {
        Self::new(config.command.clone())
            .with_args(config.args.clone())
            .with_timeout(config.timeout())
    }

    /// Sets the command arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the per-invocation timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs the command and returns its complete stdout.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Process`] on spawn failure, non-zero exit or
    /// timeout.
    pub fn capture(&self) -> Result<String> {
        let _in_flight = self.gate.lock().unwrap_or_else(PoisonError::into_inner);

        let failure = match run_with_timeout(&self.command, &self.args, self.timeout) {
            SubprocessResult::Success(output) => {
                return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
            }
            SubprocessResult::Failed(output) => ProcessFailure::Exit(output.status.code()),
            SubprocessResult::Timeout => ProcessFailure::Timeout(self.timeout),
            SubprocessResult::SpawnError(e) => ProcessFailure::Spawn(e.to_string()),
        };
        Err(TelemetryError::Process { command: self.command.clone(), failure })
    }
}

impl Default for CommandSampler {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COMMAND)
    }
}

impl Sampler for CommandSampler {
    fn sample(&self) -> Result<Sample> {
        let report = self.capture()?;
        debug!("captured {} bytes from {}", report.len(), self.command);
        parser::parse(&report)
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

/// Replays captured reports in rotation, stamping each with the current time.
#[derive(Debug)]
pub struct ReplaySampler {
    reports: Vec<String>,
    cursor: AtomicUsize,
}

impl ReplaySampler {
    /// Creates a replay over `reports`.
    ///
    /// An empty list yields [`TelemetryError::ParseNotFound`] on every call.
    #[must_use]
    pub fn new(reports: Vec<String>) -> Self {
        Self { reports, cursor: AtomicUsize::new(0) }
    }

    /// Replays a single report forever.
    #[must_use]
    pub fn single(report: impl Into<String>) -> Self {
        Self::new(vec![report.into()])
    }

    /// Loads one report per file.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Io`] if any file cannot be read.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let reports = paths
            .iter()
            .map(|path| std::fs::read_to_string(path))
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self::new(reports))
    }

    /// Number of reports in rotation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Returns true if there is nothing to replay.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl Sampler for ReplaySampler {
    fn sample(&self) -> Result<Sample> {
        if self.reports.is_empty() {
            return Err(TelemetryError::ParseNotFound);
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.reports.len();
        parser::parse(&self.reports[index])
    }

    fn describe(&self) -> String {
        format!("replay of {} report(s)", self.reports.len())
    }
}
