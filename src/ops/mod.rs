//! High-level operations.
//!
//! This module contains the implementation of sharpbuild commands.

pub mod dispatch;
pub mod doctor;
pub mod report;

pub use dispatch::{bindings_args, toolchain_args, BuildError, Dispatcher};
pub use doctor::{doctor, format_report, DoctorOptions, DoctorReport};
pub use report::{reporter_for, FailureReporter, LogReporter, PromptReporter};
