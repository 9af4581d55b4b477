//! Test utilities and mocks for sharpbuild unit tests.
//!
//! This module provides stand-ins for the seams that are hard to test in
//! isolation: process launching, process invocation and failure reporting.
//!
//! # Example
//!
//! ```rust,ignore
//! use sharpbuild::test_support::{MockProcessOutput, RecordingInvoker, RecordingReporter};
//!
//! #[test]
//! fn test_example() {
//!     let invoker = RecordingInvoker::new();
//!     invoker.push(MockProcessOutput::failure(7, "error CS1002"));
//!
//!     let reporter = RecordingReporter::new();
//!     // Hand both to a Dispatcher...
//! }
//! ```

pub mod fixtures;

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::ops::report::FailureReporter;
use crate::util::process::{Invoke, InvokeError, Launch, ProcessBuilder, ProcessResult};

pub use fixtures::*;

/// Launcher that counts launch attempts.
///
/// Delegates to [`Command::spawn`] unless built with [`SpyLauncher::failing`].
#[derive(Debug, Default)]
pub struct SpyLauncher {
    launches: AtomicUsize,
    fail: bool,
}

impl SpyLauncher {
    /// Create a spy that launches for real.
    pub fn new() -> Self {
        SpyLauncher::default()
    }

    /// Create a spy whose every launch fails.
    pub fn failing() -> Self {
        SpyLauncher {
            launches: AtomicUsize::new(0),
            fail: true,
        }
    }

    /// Number of launch attempts so far.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

impl Launch for SpyLauncher {
    fn launch(&self, command: &mut Command) -> io::Result<Child> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "launch refused by SpyLauncher",
            ));
        }
        command.spawn()
    }
}

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    /// Combined output.
    pub output: String,
}

impl MockProcessOutput {
    /// Create a successful output.
    pub fn success(output: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            output: output.into(),
        }
    }

    /// Create a failure output with the given status code.
    pub fn failure(status: i32, output: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            output: output.into(),
        }
    }

    fn into_result(self) -> ProcessResult {
        ProcessResult {
            exit_code: self.status,
            output: self.output.into_bytes(),
            elapsed: Duration::from_millis(10),
            truncated: false,
        }
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

/// Scripted outcome of one invocation.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// The process ran and produced this output.
    Exit(MockProcessOutput),
    /// The program does not exist.
    NotFound,
    /// The program could not be started.
    LaunchFailure,
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl RecordedCall {
    /// Value following `flag` in the arguments.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|arg| arg == flag)
    }
}

/// Invoker that records calls and replays scripted outcomes.
///
/// Outcomes are consumed in order; once exhausted every call succeeds
/// with empty output.
#[derive(Debug, Clone, Default)]
pub struct RecordingInvoker {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    outcomes: Arc<Mutex<VecDeque<MockOutcome>>>,
}

impl RecordingInvoker {
    /// Create a new recording invoker.
    pub fn new() -> Self {
        RecordingInvoker::default()
    }

    /// Queue the output of the next unanswered call.
    pub fn push(&self, output: MockProcessOutput) -> &Self {
        self.push_outcome(MockOutcome::Exit(output))
    }

    /// Queue an arbitrary outcome.
    pub fn push_outcome(&self, outcome: MockOutcome) -> &Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    /// Get all calls made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The most recent call.
    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

impl Invoke for RecordingInvoker {
    fn invoke(&self, cmd: &ProcessBuilder) -> Result<ProcessResult, InvokeError> {
        self.calls.lock().unwrap().push(RecordedCall {
            program: cmd.get_program().to_path_buf(),
            args: cmd.get_args().to_vec(),
            cwd: cmd.get_cwd().map(|p| p.to_path_buf()),
        });

        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();

        match outcome {
            MockOutcome::Exit(output) => Ok(output.into_result()),
            MockOutcome::NotFound => Err(InvokeError::ExecutableNotFound {
                program: cmd.program_name(),
                path: cmd.get_program().to_path_buf(),
            }),
            MockOutcome::LaunchFailure => Err(InvokeError::LaunchFailure {
                program: cmd.program_name(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "mock launch failure"),
            }),
        }
    }
}

impl Default for MockOutcome {
    fn default() -> Self {
        MockOutcome::Exit(MockProcessOutput::default())
    }
}

/// Reporter that records every `(title, message)` pair.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        RecordingReporter::default()
    }

    /// Get all reports made so far.
    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports.lock().unwrap().clone()
    }
}

impl FailureReporter for RecordingReporter {
    fn report(&self, title: &str, message: &str) {
        self.reports
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_invoker_replays_in_order() {
        let invoker = RecordingInvoker::new();
        invoker.push(MockProcessOutput::failure(3, "boom"));
        invoker.push_outcome(MockOutcome::NotFound);

        let pb = ProcessBuilder::new("/opt/tool").args(["--Action", "Build"]);

        let first = invoker.invoke(&pb).unwrap();
        assert_eq!(first.exit_code, 3);
        assert_eq!(first.output_lossy(), "boom");

        assert!(matches!(
            invoker.invoke(&pb),
            Err(InvokeError::ExecutableNotFound { .. })
        ));

        // Exhausted: defaults to success
        assert!(invoker.invoke(&pb).unwrap().success());

        let calls = invoker.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].flag_value("--Action"), Some("Build"));
        assert!(!calls[0].has_flag("--BuildConfig"));
    }

    #[test]
    fn test_recording_reporter() {
        let reporter = RecordingReporter::new();
        reporter.report("title", "message");
        assert_eq!(
            reporter.reports(),
            vec![("title".to_string(), "message".to_string())]
        );
    }
}
