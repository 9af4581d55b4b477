//! sharpbuild CLI - build actions for a managed-code engine plugin

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use sharpbuild::core::BuildAction;
use sharpbuild::util::shell::{ColorChoice, Shell};
use sharpbuild::util::ProjectOverrides;

/// Options shared by every command.
pub struct GlobalOptions {
    pub shell: Shell,
    pub overrides: ProjectOverrides,
    pub unattended: bool,
}

fn main() {
    if let Err(e) = run() {
        if !e.is::<commands::ActionFailed>() {
            eprintln!("error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("sharpbuild=debug")
    } else if cli.quiet {
        EnvFilter::new("sharpbuild=error")
    } else {
        EnvFilter::new("sharpbuild=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let json = matches!(&cli.command, Commands::Paths(args) if args.json);

    let opts = GlobalOptions {
        shell: Shell::from_flags(cli.quiet, cli.verbose, color, json),
        overrides: ProjectOverrides {
            project_dir: cli.project_dir,
            engine_dir: cli.engine_dir,
            plugin_dir: cli.plugin_dir,
            project_name: cli.project_name,
        },
        unattended: cli.unattended,
    };

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(BuildAction::Build, args.configuration, &opts),
        Commands::Rebuild(args) => {
            commands::build::execute(BuildAction::Rebuild, args.configuration, &opts)
        }
        Commands::Clean => commands::build::execute(BuildAction::Clean, None, &opts),
        Commands::GenerateProject => {
            commands::build::execute(BuildAction::GenerateProject, None, &opts)
        }
        Commands::Bindings(args) => {
            commands::build::execute(BuildAction::BuildBindings, args.configuration, &opts)
        }
        Commands::Paths(args) => commands::paths::execute(args, &opts),
        Commands::Doctor => commands::doctor::execute(&opts),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
