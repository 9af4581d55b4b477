//! Core data types.

pub mod action;
pub mod layout;

pub use action::{BuildAction, BuildConfiguration, RunMode};
pub use layout::{host_platform_name, ArtifactLayout, ProjectRoots};
