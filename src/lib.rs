//! sharpbuild - Toolchain orchestration for a managed-code engine plugin
//!
//! This crate locates an installed .NET toolchain, runs it or the plugin's
//! companion build tool as a child process with a constructed argument set,
//! captures the combined output and reports the outcome.

pub mod core;
pub mod ops;
pub mod toolchain;
pub mod util;

/// Test utilities and mocks for sharpbuild unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides stand-ins for process launching, process
/// invocation and failure reporting.
#[cfg(test)]
pub mod test_support;

pub use core::{ArtifactLayout, BuildAction, BuildConfiguration, ProjectRoots, RunMode};
pub use ops::{BuildError, Dispatcher, FailureReporter};
pub use toolchain::ToolchainLocation;
pub use util::context::GlobalContext;
pub use util::process::{Invoke, InvokeError, ProcessBuilder, ProcessInvoker, ProcessResult};
