//! Shared utilities

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod process;
pub mod shell;

pub use config::Config;
pub use context::{GlobalContext, ProjectOverrides};
pub use diagnostic::Diagnostic;
pub use process::{Invoke, InvokeError, ProcessBuilder, ProcessInvoker, ProcessResult};
pub use shell::Shell;
