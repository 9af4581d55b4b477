//! Global context for sharpbuild operations.
//!
//! Provides centralized access to configuration, paths, and environment,
//! and resolves the roots every artifact path is derived from.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::layout::{host_platform_name, ProjectRoots};
use crate::util::config::{global_config_dir, load_config, project_config_path, Config};
use crate::util::diagnostic::suggestions;

/// File extension of an engine project descriptor.
pub const PROJECT_FILE_EXTENSION: &str = "uproject";

/// Plugin directory relative to the project when none is configured.
pub const DEFAULT_PLUGIN_SUBDIR: &str = "Plugins/UnrealSharp";

/// Root paths given on the command line; each overrides configuration.
#[derive(Debug, Clone, Default)]
pub struct ProjectOverrides {
    pub project_dir: Option<PathBuf>,
    pub engine_dir: Option<PathBuf>,
    pub plugin_dir: Option<PathBuf>,
    pub project_name: Option<String>,
}

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global sharpbuild data (~/.sharpbuild/)
    home: PathBuf,

    /// Whether to use verbose output
    verbose: bool,

    /// Whether to use colors in output
    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let home = global_config_dir().unwrap_or_else(|| cwd.join(".sharpbuild"));

        Ok(GlobalContext {
            cwd,
            home,
            verbose: false,
            color: true,
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Use a different home directory for global configuration.
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Set color output.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the sharpbuild home directory (~/.sharpbuild/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if color output is enabled.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Find the project directory: the nearest ancestor of cwd holding a
    /// `.uproject` file, or cwd itself.
    pub fn find_project_dir(&self) -> PathBuf {
        let mut current = self.cwd.clone();
        loop {
            if matches!(find_project_file(&current), Ok(Some(_))) {
                return current;
            }
            if !current.pop() {
                return self.cwd.clone();
            }
        }
    }

    /// Load global and project configuration for a project directory.
    pub fn load_config(&self, project_dir: &Path) -> Config {
        load_config(&self.config_path(), &project_config_path(project_dir))
    }

    /// Resolve the absolute project roots from overrides and configuration.
    ///
    /// Relative flag values are taken from the current directory, relative
    /// config values from the project directory.
    pub fn project_roots(&self, config: &Config, overrides: &ProjectOverrides) -> Result<ProjectRoots> {
        let project_dir = match &overrides.project_dir {
            Some(dir) => self.cwd.join(dir),
            None => self.find_project_dir(),
        };

        let from_flag = |dir: &PathBuf| self.cwd.join(dir);
        let from_config = |dir: &PathBuf| project_dir.join(dir);

        let Some(engine_dir) = overrides
            .engine_dir
            .as_ref()
            .map(from_flag)
            .or_else(|| config.project.engine_dir.as_ref().map(from_config))
        else {
            bail!(
                "engine directory is not configured\n{}",
                suggestions::ENGINE_DIR_MISSING
            );
        };

        let plugin_dir = overrides
            .plugin_dir
            .as_ref()
            .map(from_flag)
            .or_else(|| config.project.plugin_dir.as_ref().map(from_config))
            .unwrap_or_else(|| project_dir.join(DEFAULT_PLUGIN_SUBDIR));

        let project_name = match overrides
            .project_name
            .clone()
            .or_else(|| config.project.name.clone())
        {
            Some(name) => name,
            None => detect_project_name(&project_dir)?,
        };

        let platform = config
            .project
            .platform
            .clone()
            .unwrap_or_else(|| host_platform_name().to_string());

        let roots = ProjectRoots {
            engine_dir,
            project_dir,
            project_name,
            plugin_dir,
            platform,
            framework: config.toolchain.framework().to_string(),
        };

        roots
            .into_absolute()
            .context("failed to make project paths absolute")
    }
}

/// Find the `.uproject` file in a directory.
///
/// With several candidates the alphabetically first one wins.
pub fn find_project_file(dir: &Path) -> Result<Option<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(PROJECT_FILE_EXTENSION)
        })
        .collect();
    candidates.sort();

    if candidates.len() > 1 {
        tracing::warn!(
            "Multiple project files in {}; using {}",
            dir.display(),
            candidates[0].display()
        );
    }

    Ok(candidates.into_iter().next())
}

/// Project name from the `.uproject` stem, falling back to the directory name.
pub fn detect_project_name(project_dir: &Path) -> Result<String> {
    let from_file = find_project_file(project_dir)
        .ok()
        .flatten()
        .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()));

    if let Some(name) = from_file {
        return Ok(name);
    }

    project_dir
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| {
            format!(
                "cannot derive a project name from {}\n{}",
                project_dir.display(),
                suggestions::PROJECT_NAME_MISSING
            )
        })
}
