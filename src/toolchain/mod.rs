//! Toolchain discovery.
//!
//! The .NET toolchain is found by scanning a search-path variable for an
//! entry containing the platform's install folder. Once found, a location
//! stays fixed for the rest of the process.

pub mod detect;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use semver::Version;
use serde::Serialize;

use crate::util::config::ToolchainSettings;

pub use detect::{
    installed_host_fxr, installed_sdks, locate_toolchain_directory, scan_search_path,
    ToolchainScan,
};

/// Process-wide location, written on the first successful lookup.
static LOCATION: OnceLock<ToolchainLocation> = OnceLock::new();

/// Where the toolchain lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainLocation {
    /// Install directory of the SDK
    pub sdk_dir: PathBuf,
    /// The toolchain's command-line executable
    pub executable: PathBuf,
}

impl ToolchainLocation {
    /// Create a location from an install directory and executable file name.
    pub fn new(sdk_dir: impl Into<PathBuf>, executable_name: &str) -> Self {
        let sdk_dir = sdk_dir.into();
        let executable = executable_path(&sdk_dir, executable_name);
        ToolchainLocation {
            sdk_dir,
            executable,
        }
    }

    /// Look the toolchain up without consulting the cache.
    pub fn locate(settings: &ToolchainSettings) -> Option<Self> {
        locate_toolchain_directory(settings)
            .map(|dir| ToolchainLocation::new(dir, settings.executable()))
    }

    /// Look the toolchain up once per process.
    ///
    /// Failed lookups are not cached, so a later call may still succeed.
    /// Settings passed after the first success are ignored.
    pub fn locate_cached(settings: &ToolchainSettings) -> Option<Self> {
        if let Some(location) = LOCATION.get() {
            return Some(location.clone());
        }

        let location = Self::locate(settings)?;
        // A racing caller computes the same value, so losing the race is harmless.
        Some(LOCATION.get_or_init(|| location).clone())
    }

    /// SDK versions installed alongside the executable.
    pub fn installed_sdks(&self) -> Vec<Version> {
        installed_sdks(&self.sdk_dir)
    }

    /// Path of the host fxr library used to boot the managed runtime.
    ///
    /// Without an explicit version, the highest installed one is used.
    pub fn runtime_host_path(&self, version: Option<&str>) -> Option<PathBuf> {
        let version = match version {
            Some(v) => v.to_string(),
            None => installed_host_fxr(&self.sdk_dir).pop()?.to_string(),
        };

        Some(
            self.sdk_dir
                .join("host")
                .join("fxr")
                .join(version)
                .join(host_fxr_library_name()),
        )
    }
}

/// Join the executable name onto a toolchain directory.
///
/// An empty directory yields a bare relative name: well-formed but not a
/// usable absolute path.
pub fn executable_path(dir: &Path, executable_name: &str) -> PathBuf {
    dir.join(executable_name)
}

/// Platform file name of the host fxr library.
pub fn host_fxr_library_name() -> &'static str {
    match std::env::consts::OS {
        "windows" => "hostfxr.dll",
        "macos" => "libhostfxr.dylib",
        _ => "libhostfxr.so",
    }
}
