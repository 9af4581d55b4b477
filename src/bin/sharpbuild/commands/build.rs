//! `sharpbuild build`, `rebuild`, `clean`, `generate-project` and `bindings`

use anyhow::Result;

use super::{ActionFailed, Session};
use crate::GlobalOptions;
use sharpbuild::core::{BuildAction, BuildConfiguration};
use sharpbuild::ops::{reporter_for, Dispatcher};
use sharpbuild::toolchain::ToolchainLocation;
use sharpbuild::util::shell::{format_duration, Status};

pub fn execute(
    action: BuildAction,
    configuration: Option<String>,
    opts: &GlobalOptions,
) -> Result<()> {
    let shell = &opts.shell;
    let session = Session::open(opts)?;
    let layout = session.layout(opts)?;

    let settings = &session.config.toolchain;
    let toolchain = ToolchainLocation::locate_cached(settings);
    let run_mode = session.run_mode(opts);

    // CLI > config; Clean and GenerateProject drop it in the dispatcher
    let config = configuration
        .or_else(|| session.config.build.configuration.clone())
        .map(BuildConfiguration::from);

    let invoker = session.invoker();
    let reporter = reporter_for(run_mode, shell.use_color());
    let dispatcher = Dispatcher::new(&layout, settings, &invoker, reporter.as_ref())
        .with_toolchain(toolchain.as_ref())
        .with_run_mode(run_mode);

    shell.status(
        status_for(action),
        format!("{} ({})", action, layout.project_name),
    );

    let spinner = shell.spinner(format!("Running {}", action));
    let outcome = dispatcher.execute(action, config.as_ref());
    spinner.finish();

    match outcome {
        Ok(result) => {
            shell.tool_output(&result.output_lossy());
            if result.truncated {
                shell.warn("Tool output is incomplete; some bytes were dropped or arrived after exit");
            }
            shell.status(
                Status::Finished,
                format!("{} in {}", action, format_duration(result.elapsed)),
            );
            Ok(())
        }
        Err(e) => {
            reporter.report_error(&e);
            // The prompt already shows the suggestion.
            if run_mode.is_unattended() {
                if let Some(help) = e.suggestion() {
                    shell.hint(help);
                }
            }
            Err(ActionFailed(e).into())
        }
    }
}

fn status_for(action: BuildAction) -> Status {
    match action {
        BuildAction::Clean => Status::Cleaning,
        BuildAction::GenerateProject => Status::Generating,
        BuildAction::Build | BuildAction::Rebuild | BuildAction::BuildBindings => {
            Status::Building
        }
    }
}
