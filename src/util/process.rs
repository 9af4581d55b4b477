//! Subprocess execution utilities.
//!
//! [`ProcessInvoker`] runs one child to completion with stdout and stderr
//! merged into a single anonymous pipe. A reader thread drains the pipe into a
//! bounded channel while the calling thread alternates between receiving
//! chunks and polling for exit, so a chatty child can never block on a full
//! pipe while its parent waits.

use std::borrow::Cow;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Size of a single read from the output pipe.
const CHUNK_SIZE: usize = 16 * 1024;

/// Chunks the reader thread may queue ahead of the waiter.
const CHANNEL_DEPTH: usize = 64;

/// How long to wait for trailing output once the child has exited.
///
/// A descendant that inherited the pipe can keep it open indefinitely.
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    env_remove: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            env_remove: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Remove an environment variable.
    pub fn env_remove(mut self, key: impl AsRef<str>) -> Self {
        self.env_remove.push(key.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the explicit working directory, if any.
    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Base file name of the program, used in messages.
    pub fn program_name(&self) -> String {
        self.program
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Working directory the child will run in.
    ///
    /// Falls back to the program's own directory.
    pub fn effective_cwd(&self) -> Option<PathBuf> {
        self.cwd.clone().or_else(|| {
            self.program
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
        })
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        for key in &self.env_remove {
            cmd.env_remove(key);
        }

        if let Some(cwd) = self.effective_cwd() {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Arguments joined for logs, quoting those that contain whitespace.
    pub fn display_args(&self) -> String {
        self.args
            .iter()
            .map(|arg| quote_arg(arg))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![quote_arg(&self.program.display().to_string()).into_owned()];
        parts.extend(self.args.iter().map(|arg| quote_arg(arg).into_owned()));
        parts.join(" ")
    }
}

fn quote_arg(arg: &str) -> Cow<'_, str> {
    if arg.is_empty() || arg.chars().any(char::is_whitespace) {
        Cow::Owned(format!("\"{}\"", arg))
    } else {
        Cow::Borrowed(arg)
    }
}

/// Outcome of a child process that was launched successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessResult {
    /// Exit code; signal terminations map to `128 + signal`
    pub exit_code: i32,
    /// Everything the child wrote to stdout and stderr, interleaved
    pub output: Vec<u8>,
    /// Wall-clock time from invocation to exit
    pub elapsed: Duration,
    /// Whether some output is missing: leading bytes dropped to honour an
    /// output cap, or trailing bytes still unread when capture stopped
    pub truncated: bool,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Output decoded as UTF-8, replacing invalid sequences.
    pub fn output_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }
}

/// Errors from [`Invoke::invoke`].
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The program does not exist; nothing was launched.
    #[error("failed to find {program} at {}", path.display())]
    ExecutableNotFound { program: String, path: PathBuf },

    /// The OS refused to create the process.
    #[error("{program} failed to launch")]
    LaunchFailure {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The child was launched but its output or exit status could not be collected.
    #[error("failed to collect output of {program}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Spawns a prepared command.
///
/// The seam between the invoker and the OS.
pub trait Launch: Send + Sync {
    fn launch(&self, command: &mut Command) -> io::Result<Child>;
}

/// Launches processes with [`Command::spawn`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launch for SystemLauncher {
    fn launch(&self, command: &mut Command) -> io::Result<Child> {
        command.spawn()
    }
}

/// Runs a process to completion.
pub trait Invoke: Send + Sync {
    fn invoke(&self, cmd: &ProcessBuilder) -> Result<ProcessResult, InvokeError>;
}

/// Runs one child at a time on the calling thread and captures its output.
#[derive(Debug, Clone)]
pub struct ProcessInvoker<L = SystemLauncher> {
    launcher: L,
    max_output_bytes: Option<usize>,
    poll_interval: Duration,
}

impl ProcessInvoker {
    /// Create an invoker that launches real processes.
    pub fn new() -> Self {
        ProcessInvoker::with_launcher(SystemLauncher)
    }
}

impl Default for ProcessInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Launch> ProcessInvoker<L> {
    /// Create an invoker with a custom launcher.
    pub fn with_launcher(launcher: L) -> Self {
        ProcessInvoker {
            launcher,
            max_output_bytes: None,
            poll_interval: Duration::from_millis(20),
        }
    }

    /// Keep at most `limit` trailing bytes of output. `None` keeps everything.
    pub fn max_output_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_output_bytes = limit;
        self
    }

    /// How often the waiter checks for exit while no output arrives.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Get the launcher.
    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    fn run(&self, cmd: &ProcessBuilder, start: Instant) -> Result<ProcessResult, InvokeError> {
        let program = cmd.program_name();
        let launch_failure = |source| InvokeError::LaunchFailure {
            program: program.clone(),
            source,
        };
        let io_failure = |source| InvokeError::Io {
            program: program.clone(),
            source,
        };

        let (reader, writer) = io::pipe().map_err(launch_failure)?;
        let stderr = writer.try_clone().map_err(launch_failure)?;

        let mut command = cmd.build_command();
        command.stdin(Stdio::null()).stdout(writer).stderr(stderr);
        hide_window(&mut command);

        tracing::debug!("launching {}", cmd.display_command());
        let spawned = self.launcher.launch(&mut command);
        // The command holds the parent's copies of the write end; the reader
        // only sees EOF once they are gone.
        drop(command);
        let mut child = ChildGuard::new(spawned.map_err(launch_failure)?);

        let (tx, rx) = mpsc::sync_channel(CHANNEL_DEPTH);
        thread::Builder::new()
            .name(format!("{}-output", program))
            .spawn(move || pump(reader, tx))
            .map_err(io_failure)?;

        let mut buffer = OutputBuffer::new(self.max_output_bytes);

        let status = loop {
            match rx.recv_timeout(self.poll_interval) {
                Ok(chunk) => buffer.push(&chunk.map_err(io_failure)?),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    // Every writer is closed; nothing left to drain.
                    break child.wait().map_err(io_failure)?;
                }
            }

            if let Some(status) = child.try_wait().map_err(io_failure)? {
                break status;
            }
        };

        loop {
            match rx.recv_timeout(EXIT_DRAIN_GRACE) {
                Ok(chunk) => buffer.push(&chunk.map_err(io_failure)?),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        "{} exited but its output pipe is still open; later output is not captured",
                        program
                    );
                    buffer.mark_incomplete();
                    break;
                }
            }
        }

        let (output, truncated) = buffer.finish();
        let elapsed = start.elapsed();
        let exit_code = exit_code(status);

        tracing::debug!(
            "{} exited with code {} after {:.2}s ({} bytes of output)",
            program,
            exit_code,
            elapsed.as_secs_f64(),
            output.len()
        );

        Ok(ProcessResult {
            exit_code,
            output,
            elapsed,
            truncated,
        })
    }
}

impl<L: Launch> Invoke for ProcessInvoker<L> {
    fn invoke(&self, cmd: &ProcessBuilder) -> Result<ProcessResult, InvokeError> {
        let start = Instant::now();
        let path = cmd.get_program();

        if !path.exists() {
            return Err(InvokeError::ExecutableNotFound {
                program: cmd.program_name(),
                path: path.to_path_buf(),
            });
        }

        self.run(cmd, start)
    }
}

/// Reads the pipe until EOF, forwarding chunks to the waiter.
fn pump(mut reader: io::PipeReader, tx: SyncSender<io::Result<Vec<u8>>>) {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(Ok(buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.send(Err(e));
                break;
            }
        }
    }
}

/// Owns a running child and reaps it on every exit path.
///
/// A child still running when the guard drops is killed and waited for.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        ChildGuard {
            child,
            reaped: false,
        }
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        self.reaped = status.is_some();
        Ok(status)
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Accumulates output, optionally keeping only the trailing `limit` bytes.
#[derive(Debug)]
struct OutputBuffer {
    data: Vec<u8>,
    limit: Option<usize>,
    truncated: bool,
}

impl OutputBuffer {
    fn new(limit: Option<usize>) -> Self {
        OutputBuffer {
            data: Vec::new(),
            limit,
            truncated: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
        if let Some(limit) = self.limit {
            // Compact lazily so each byte is moved a bounded number of times.
            if self.data.len() > limit.saturating_mul(2).max(CHUNK_SIZE) {
                self.compact(limit);
            }
        }
    }

    fn mark_incomplete(&mut self) {
        self.truncated = true;
    }

    fn compact(&mut self, limit: usize) {
        if self.data.len() > limit {
            let excess = self.data.len() - limit;
            self.data.drain(..excess);
            self.truncated = true;
        }
    }

    fn finish(mut self) -> (Vec<u8>, bool) {
        if let Some(limit) = self.limit {
            self.compact(limit);
        }
        (self.data, self.truncated)
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(windows)]
fn hide_window(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_window(_command: &mut Command) {}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
