//! Configuration file support for sharpbuild.
//!
//! Two configuration file locations are read:
//! - Global: `~/.sharpbuild/config.toml` - User-wide defaults
//! - Project: `<project>/.sharpbuild/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::VersionReq;
use serde::{Deserialize, Serialize};

/// Directory name holding sharpbuild configuration.
pub const CONFIG_DIR_NAME: &str = ".sharpbuild";

/// Default target framework of the plugin's assemblies.
pub const DEFAULT_FRAMEWORK: &str = "net8.0";

/// sharpbuild configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host project settings
    pub project: ProjectConfig,

    /// Toolchain discovery settings
    pub toolchain: ToolchainSettings,

    /// Build settings
    pub build: BuildSettings,
}

/// Host project settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Project name (defaults to the `.uproject` file stem)
    pub name: Option<String>,

    /// Engine installation directory
    pub engine_dir: Option<PathBuf>,

    /// Plugin directory (defaults to `<project>/Plugins/UnrealSharp`)
    pub plugin_dir: Option<PathBuf>,

    /// Platform name for staged builds (defaults to the host platform)
    pub platform: Option<String>,
}

/// Toolchain discovery settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ToolchainSettings {
    /// Search-path variable scanned for the install directory (default `PATH`)
    pub path_variable: Option<String>,

    /// Substring identifying the install directory
    pub marker: Option<String>,

    /// Search-path entries containing any of these are never matched
    /// (default: the global tools folder `.dotnet/tools`)
    pub exclude: Option<Vec<String>>,

    /// Executable file name inside the install directory
    pub executable: Option<String>,

    /// Only accept installs with a matching SDK (e.g. "^8.0")
    pub sdk_version: Option<VersionReq>,

    /// Target framework of the plugin's compiled assemblies (default `net8.0`)
    pub framework: Option<String>,

    /// Host fxr version (defaults to the highest installed)
    pub hostfxr_version: Option<String>,
}

impl ToolchainSettings {
    pub fn path_variable(&self) -> &str {
        self.path_variable.as_deref().unwrap_or("PATH")
    }

    pub fn marker(&self) -> &str {
        self.marker.as_deref().unwrap_or(default_marker())
    }

    pub fn exclude(&self) -> Vec<&str> {
        match &self.exclude {
            Some(entries) => entries.iter().map(String::as_str).collect(),
            None => vec![default_exclude()],
        }
    }

    pub fn executable(&self) -> &str {
        self.executable.as_deref().unwrap_or(default_executable())
    }

    pub fn framework(&self) -> &str {
        self.framework.as_deref().unwrap_or(DEFAULT_FRAMEWORK)
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: ToolchainSettings) {
        if other.path_variable.is_some() {
            self.path_variable = other.path_variable;
        }
        if other.marker.is_some() {
            self.marker = other.marker;
        }
        if other.exclude.is_some() {
            self.exclude = other.exclude;
        }
        if other.executable.is_some() {
            self.executable = other.executable;
        }
        if other.sdk_version.is_some() {
            self.sdk_version = other.sdk_version;
        }
        if other.framework.is_some() {
            self.framework = other.framework;
        }
        if other.hostfxr_version.is_some() {
            self.hostfxr_version = other.hostfxr_version;
        }
    }
}

/// Install folder of the toolchain as it appears in the search path.
pub fn default_marker() -> &'static str {
    if cfg!(windows) {
        "Program Files\\dotnet\\"
    } else if cfg!(target_os = "macos") {
        "/usr/local/share/dotnet"
    } else {
        "dotnet"
    }
}

/// Global tools folder the SDK installer adds to the search path. It holds
/// installed tools, not the toolchain.
pub fn default_exclude() -> &'static str {
    if cfg!(windows) {
        ".dotnet\\tools"
    } else {
        ".dotnet/tools"
    }
}

/// File name of the toolchain executable.
pub fn default_executable() -> &'static str {
    if cfg!(windows) {
        "dotnet.exe"
    } else {
        "dotnet"
    }
}

/// Build settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildSettings {
    /// Configuration used by build, rebuild and bindings when none is given
    pub configuration: Option<String>,

    /// Treat every run as unattended
    pub unattended: bool,

    /// Keep only the last N bytes of tool output (None = keep everything)
    pub max_output_bytes: Option<usize>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory: {}", parent.display())
            })?;
        }

        let contents =
            toml::to_string_pretty(self).with_context(|| "failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Project settings
        if other.project.name.is_some() {
            self.project.name = other.project.name;
        }
        if other.project.engine_dir.is_some() {
            self.project.engine_dir = other.project.engine_dir;
        }
        if other.project.plugin_dir.is_some() {
            self.project.plugin_dir = other.project.plugin_dir;
        }
        if other.project.platform.is_some() {
            self.project.platform = other.project.platform;
        }

        self.toolchain.merge(other.toolchain);

        // Build settings
        if other.build.configuration.is_some() {
            self.build.configuration = other.build.configuration;
        }
        if other.build.unattended {
            self.build.unattended = true;
        }
        if other.build.max_output_bytes.is_some() {
            self.build.max_output_bytes = other.build.max_output_bytes;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.sharpbuild/config.toml)
/// 2. Global config (~/.sharpbuild/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    // Load global config first
    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    // Project config overrides global
    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

/// Get the global sharpbuild config directory (~/.sharpbuild).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(CONFIG_DIR_NAME))
}

/// Get the global config path (~/.sharpbuild/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (<project>/.sharpbuild/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR_NAME).join("config.toml")
}
