//! Subprocess execution with timeout support.
//!
//! The diagnostic command can hang (driver reset, stuck kernel module), so
//! every invocation is bounded: the child is polled until it exits or the
//! deadline passes, in which case it is killed and reaped. Pipes are drained
//! on helper threads so a chatty child never blocks on a full pipe; output
//! still unread at the deadline is abandoned, since a grandchild may hold the
//! pipe open long after the child exits.

use log::debug;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Minimum time left to read pipes after the child exits.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

const CHUNK_SIZE: usize = 8192;

/// Result of a subprocess execution with timeout.
#[derive(Debug)]
pub enum SubprocessResult {
    /// Command completed successfully with output.
    Success(Output),
    /// Command timed out and was killed.
    Timeout,
    /// Command failed to spawn or could not be waited on.
    SpawnError(io::Error),
    /// Command exited with non-zero status.
    Failed(Output),
}

/// Runs a command, killing it if it has not exited within `timeout`.
///
/// Stdin is closed; stdout and stderr are captured until they close or the
/// deadline passes.
pub fn run_with_timeout<S: AsRef<str>>(
    cmd: &str,
    args: &[S],
    timeout: Duration,
) -> SubprocessResult {
    let spawned = Command::new(cmd)
        .args(args.iter().map(<S as AsRef<str>>::as_ref))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => return SubprocessResult::SpawnError(e),
    };

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = match wait_with_deadline(&mut child, deadline) {
        Ok(Some(status)) => status,
        Ok(None) => return SubprocessResult::Timeout,
        Err(e) => return SubprocessResult::SpawnError(e),
    };

    let drain_deadline = deadline.max(Instant::now() + DRAIN_GRACE);
    let output = Output {
        status,
        stdout: collect(stdout, drain_deadline),
        stderr: collect(stderr, drain_deadline),
    };
    if output.status.success() {
        SubprocessResult::Success(output)
    } else {
        SubprocessResult::Failed(output)
    }
}

/// Polls `child` until it exits; kills and reaps it once `deadline` passes.
fn wait_with_deadline(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            // Already-exited races surface as an error from kill; reaping still succeeds.
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Forwards pipe contents chunk by chunk until EOF.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => return,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        return;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => return,
            }
        }
    });
    rx
}

/// Collects forwarded chunks until the pipe closes or `deadline` passes.
fn collect(reader: Option<Receiver<Vec<u8>>>, deadline: Instant) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(rx) = reader else {
        return buf;
    };
    loop {
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(chunk) => buf.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => return buf,
            Err(RecvTimeoutError::Timeout) => {
                debug!("pipe still open at deadline, keeping {} bytes", buf.len());
                return buf;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn stdout_of(result: &SubprocessResult) -> String {
        match result {
            SubprocessResult::Success(output) | SubprocessResult::Failed(output) => {
                String::from_utf8_lossy(&output.stdout).into_owned()
            }
            other => panic!("command did not complete: {other:?}"),
        }
    }

    #[test]
    fn test_successful_command() {
        let result = run_with_timeout("echo", &["hello"], Duration::from_secs(2));
        assert!(matches!(result, SubprocessResult::Success(_)));
        assert_eq!(stdout_of(&result).trim(), "hello");
    }

    #[test]
    fn test_command_with_args() {
        let result = run_with_timeout("printf", &["%s %s", "foo", "bar"], Duration::from_secs(2));
        assert_eq!(stdout_of(&result), "foo bar");
    }

    #[test]
    fn test_timeout_kills_slow_command() {
        let start = Instant::now();
        let result = run_with_timeout("sleep", &["10"], Duration::from_millis(100));
        let elapsed = start.elapsed();

        assert!(matches!(result, SubprocessResult::Timeout));
        assert!(elapsed < Duration::from_secs(2), "Should timeout quickly, took {:?}", elapsed);
    }

    #[test]
    fn test_nonexistent_command() {
        let result = run_with_timeout(
            "this_command_does_not_exist_12345",
            &[] as &[&str],
            Duration::from_secs(1),
        );
        assert!(matches!(result, SubprocessResult::SpawnError(_)));
    }

    #[test]
    fn test_failed_command() {
        let result = run_with_timeout("false", &[] as &[&str], Duration::from_secs(2));
        assert!(matches!(result, SubprocessResult::Failed(_)));
    }

    #[test]
    fn test_failed_command_keeps_stdout() {
        let result =
            run_with_timeout("sh", &["-c", "echo partial; exit 3"], Duration::from_secs(2));
        match result {
            SubprocessResult::Failed(output) => {
                assert_eq!(output.status.code(), Some(3));
                assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "partial");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_large_output_does_not_block() {
        let result = run_with_timeout("seq", &["1", "100000"], Duration::from_secs(5));
        assert!(matches!(result, SubprocessResult::Success(_)));
        assert!(stdout_of(&result).ends_with("100000\n"));
    }

    #[test]
    fn test_grandchild_holding_stdout_does_not_outlast_timeout() {
        let start = Instant::now();
        let result =
            run_with_timeout("sh", &["-c", "sleep 5 & echo early"], Duration::from_millis(300));
        let elapsed = start.elapsed();

        assert!(matches!(result, SubprocessResult::Success(_)));
        assert_eq!(stdout_of(&result).trim(), "early");
        assert!(elapsed < Duration::from_secs(2), "drain outlived the timeout: {:?}", elapsed);
    }

    #[test]
    fn test_owned_string_args() {
        let args = vec!["owned".to_string()];
        let result = run_with_timeout("echo", &args, Duration::from_secs(2));
        assert_eq!(stdout_of(&result).trim(), "owned");
    }
}
