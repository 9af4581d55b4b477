//! Command implementations

pub mod build;
pub mod completions;
pub mod doctor;
pub mod paths;

use anyhow::Result;
use thiserror::Error;

use crate::GlobalOptions;
use sharpbuild::core::{ArtifactLayout, RunMode};
use sharpbuild::ops::BuildError;
use sharpbuild::util::{Config, GlobalContext, ProcessInvoker};

/// A build action failure that has already been logged and reported.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ActionFailed(pub BuildError);

/// Context and configuration shared by the project commands.
pub struct Session {
    pub ctx: GlobalContext,
    pub config: Config,
}

impl Session {
    /// Load configuration for the selected project.
    pub fn open(opts: &GlobalOptions) -> Result<Self> {
        let mut ctx = GlobalContext::new()?;
        ctx.set_verbose(opts.shell.is_verbose());
        ctx.set_color(opts.shell.use_color());

        let project_dir = match &opts.overrides.project_dir {
            Some(dir) => ctx.cwd().join(dir),
            None => ctx.find_project_dir(),
        };
        let config = ctx.load_config(&project_dir);

        Ok(Session { ctx, config })
    }

    /// Resolve the artifact layout from flags and configuration.
    pub fn layout(&self, opts: &GlobalOptions) -> Result<ArtifactLayout> {
        let roots = self.ctx.project_roots(&self.config, &opts.overrides)?;
        tracing::debug!(
            "project {} at {}",
            roots.project_name,
            roots.project_dir.display()
        );
        Ok(ArtifactLayout::from_roots(&roots))
    }

    /// `--unattended` or `[build].unattended`.
    pub fn run_mode(&self, opts: &GlobalOptions) -> RunMode {
        RunMode::from_unattended(opts.unattended || self.config.build.unattended)
    }

    pub fn invoker(&self) -> ProcessInvoker {
        ProcessInvoker::new().max_output_bytes(self.config.build.max_output_bytes)
    }
}
