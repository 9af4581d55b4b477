//! Failure reporting.
//!
//! Attended runs stop and wait for the user to acknowledge a failure;
//! unattended runs only log it.

use std::io::{self, BufRead, BufReader, Write};
use std::sync::Mutex;

use crate::core::action::RunMode;
use crate::ops::dispatch::BuildError;
use crate::util::diagnostic::Diagnostic;

/// Surfaces a failure to whoever is running the build.
pub trait FailureReporter: Send + Sync {
    fn report(&self, title: &str, message: &str);

    /// Log a failed build action, then report it.
    fn report_error(&self, err: &BuildError) {
        err.log();
        self.report(&err.title(), &err.message());
    }
}

/// Logs failures and returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl FailureReporter for LogReporter {
    fn report(&self, title: &str, message: &str) {
        tracing::error!("{}: {}", title, message);
    }

    fn report_error(&self, err: &BuildError) {
        err.log();
    }
}

/// Prints the failure and blocks until a line is read from its input.
pub struct PromptReporter {
    input: Mutex<Box<dyn BufRead + Send>>,
    output: Mutex<Box<dyn Write + Send>>,
    color: bool,
}

impl PromptReporter {
    /// Prompt on stderr and wait on stdin.
    pub fn new(color: bool) -> Self {
        PromptReporter::with_io(
            Box::new(BufReader::new(io::stdin())),
            Box::new(io::stderr()),
            color,
        )
    }

    /// Prompt on arbitrary streams.
    pub fn with_io(
        input: Box<dyn BufRead + Send>,
        output: Box<dyn Write + Send>,
        color: bool,
    ) -> Self {
        PromptReporter {
            input: Mutex::new(input),
            output: Mutex::new(output),
            color,
        }
    }

    fn prompt(&self, diagnostic: &Diagnostic) -> io::Result<()> {
        {
            let mut output = self.output.lock().unwrap_or_else(|e| e.into_inner());
            write!(output, "{}", diagnostic.format(self.color))?;
            write!(output, "Press Enter to continue...")?;
            output.flush()?;
        }

        let mut line = String::new();
        self.input
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .read_line(&mut line)?;
        Ok(())
    }
}

impl FailureReporter for PromptReporter {
    fn report(&self, title: &str, message: &str) {
        let diagnostic = Diagnostic::error(title).with_context(message);
        if let Err(e) = self.prompt(&diagnostic) {
            tracing::debug!("failure prompt unavailable: {}", e);
            tracing::error!("{}: {}", title, message);
        }
    }

    fn report_error(&self, err: &BuildError) {
        err.log();
        if let Err(e) = self.prompt(&err.to_diagnostic()) {
            tracing::debug!("failure prompt unavailable: {}", e);
        }
    }
}

/// Pick the reporter for a run mode.
pub fn reporter_for(mode: RunMode, color: bool) -> Box<dyn FailureReporter> {
    match mode {
        RunMode::Attended => Box::new(PromptReporter::new(color)),
        RunMode::Unattended => Box::new(LogReporter),
    }
}
