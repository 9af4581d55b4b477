//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// sharpbuild - Run the toolchain and build tool of a managed-code engine plugin
#[derive(Parser)]
#[command(name = "sharpbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Headless run: never prompt, write bindings to the staging directory
    #[arg(long, global = true)]
    pub unattended: bool,

    /// Host project directory (defaults to the nearest directory with a .uproject)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Engine installation directory
    #[arg(long, global = true, env = "SHARPBUILD_ENGINE_DIR")]
    pub engine_dir: Option<PathBuf>,

    /// Plugin directory (defaults to <project>/Plugins/UnrealSharp)
    #[arg(long, global = true)]
    pub plugin_dir: Option<PathBuf>,

    /// Project name (defaults to the .uproject file name)
    #[arg(long, global = true)]
    pub project_name: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the user's managed project
    Build(ConfigArgs),

    /// Clean and build the user's managed project
    Rebuild(ConfigArgs),

    /// Remove build outputs of the managed project
    Clean,

    /// Generate the managed project files
    GenerateProject,

    /// Build the plugin's managed bindings with the toolchain
    Bindings(ConfigArgs),

    /// Print the artifact layout
    Paths(PathsArgs),

    /// Check the toolchain and project layout
    Doctor,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Build configuration (e.g. Debug, Release)
    #[arg(short = 'c', long = "configuration")]
    pub configuration: Option<String>,
}

#[derive(Args)]
pub struct PathsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
