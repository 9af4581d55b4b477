//! Toolchain detection functions.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use semver::{Version, VersionReq};

use crate::util::config::ToolchainSettings;

/// Result of scanning a search-path list for the toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainScan {
    /// First candidate containing the marker, present on disk
    Found(PathBuf),
    /// No candidate contained the marker
    NoMatch,
    /// A candidate contained the marker but is not a directory; scanning stopped there
    MissingDirectory(PathBuf),
}

impl ToolchainScan {
    pub fn found(self) -> Option<PathBuf> {
        match self {
            ToolchainScan::Found(dir) => Some(dir),
            ToolchainScan::NoMatch | ToolchainScan::MissingDirectory(_) => None,
        }
    }
}

/// Scan a delimiter-separated path list for the toolchain's install directory.
///
/// The first entry whose text contains the marker, and none of the excluded
/// substrings, decides the outcome: if it is missing on disk the scan stops
/// without trying later entries. With an SDK requirement, an existing entry
/// that has no matching `sdk/<version>` is skipped and the scan continues.
///
/// Relative entries are resolved against the current directory, so a found
/// or missing directory is always absolute.
pub fn scan_search_path(value: &OsStr, settings: &ToolchainSettings) -> ToolchainScan {
    let marker = settings.marker();
    let exclude = settings.exclude();

    for candidate in std::env::split_paths(value) {
        let text = candidate.to_string_lossy();
        if !text.contains(marker) {
            continue;
        }
        if let Some(pattern) = exclude.iter().find(|pattern| text.contains(**pattern)) {
            tracing::debug!("Skipping {}: excluded by `{}`", text, pattern);
            continue;
        }

        let candidate = match std::path::absolute(&candidate) {
            Ok(path) => path,
            Err(_) => continue,
        };

        if !candidate.is_dir() {
            return ToolchainScan::MissingDirectory(candidate);
        }

        if let Some(req) = settings.sdk_version.as_ref() {
            if !installed_sdks(&candidate).iter().any(|v| req.matches(v)) {
                tracing::debug!(
                    "Skipping {}: no SDK matching {} installed",
                    candidate.display(),
                    req
                );
                continue;
            }
        }

        return ToolchainScan::Found(candidate);
    }

    ToolchainScan::NoMatch
}

/// Locate the toolchain directory from the configured search-path variable.
///
/// Logs a warning when the matched directory does not exist.
pub fn locate_toolchain_directory(settings: &ToolchainSettings) -> Option<PathBuf> {
    let variable = settings.path_variable();
    let Some(value) = std::env::var_os(variable) else {
        tracing::debug!("{} is not set; cannot locate the toolchain", variable);
        return None;
    };

    match scan_search_path(&value, settings) {
        ToolchainScan::Found(dir) => {
            tracing::debug!("Found toolchain at {}", dir.display());
            Some(dir)
        }
        ToolchainScan::MissingDirectory(dir) => {
            tracing::warn!(
                "Found path to the toolchain, but the directory doesn't exist: {}",
                dir.display()
            );
            None
        }
        ToolchainScan::NoMatch => {
            tracing::debug!(
                "No entry of {} contains the toolchain marker `{}`",
                variable,
                settings.marker()
            );
            None
        }
    }
}

/// SDK versions installed under `<dir>/sdk`, ascending.
pub fn installed_sdks(dir: &Path) -> Vec<Version> {
    versioned_subdirs(&dir.join("sdk"))
}

/// Versions of the host fxr installed under `<dir>/host/fxr`, ascending.
pub fn installed_host_fxr(dir: &Path) -> Vec<Version> {
    versioned_subdirs(&dir.join("host").join("fxr"))
}

fn versioned_subdirs(dir: &Path) -> Vec<Version> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut versions: Vec<Version> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| Version::parse(&entry.file_name().to_string_lossy()).ok())
        .collect();
    versions.sort();
    versions
}
