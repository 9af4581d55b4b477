//! Build action dispatch.
//!
//! Maps a [`BuildAction`] to the program to run and its arguments, runs it
//! through an [`Invoke`] implementation and turns the outcome into success or
//! a reported failure. Build, Rebuild, Clean and GenerateProject go to the
//! companion build tool; BuildBindings runs the toolchain's own `build`.

use std::io;
use std::path::{Path, PathBuf};

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::action::{BuildAction, BuildConfiguration, RunMode};
use crate::core::layout::ArtifactLayout;
use crate::ops::report::FailureReporter;
use crate::toolchain::ToolchainLocation;
use crate::util::config::ToolchainSettings;
use crate::util::diagnostic::Diagnostic;
use crate::util::process::{Invoke, InvokeError, ProcessBuilder, ProcessResult};

/// Why a build action failed.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum BuildError {
    #[error("failed to locate the toolchain: no usable entry of {variable} contains `{marker}`")]
    #[diagnostic(
        code(sharpbuild::toolchain::not_located),
        help("Install the .NET SDK and add its directory to {variable}, or set [toolchain].marker in .sharpbuild/config.toml")
    )]
    ToolchainNotLocated { variable: String, marker: String },

    #[error("failed to find {program} at {}", path.display())]
    #[diagnostic(
        code(sharpbuild::process::not_found),
        help("Build the plugin's managed projects first, or check --plugin-dir")
    )]
    ExecutableNotFound { program: String, path: PathBuf },

    #[error("{program} failed to launch")]
    #[diagnostic(
        code(sharpbuild::process::launch_failure),
        help("Check that the file is executable and built for this platform")
    )]
    LaunchFailure {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} task failed (Args: {args}) with return code {exit_code}")]
    #[diagnostic(
        code(sharpbuild::build::non_zero_exit),
        help("Run with --verbose for the full tool output")
    )]
    NonZeroExit {
        program: String,
        action: BuildAction,
        args: String,
        exit_code: i32,
        output: String,
    },

    #[error("failed to collect output of {program}")]
    #[diagnostic(code(sharpbuild::process::io))]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    /// Short title for a failure report.
    pub fn title(&self) -> String {
        match self {
            BuildError::ToolchainNotLocated { .. } => "Failed to locate the toolchain".to_string(),
            BuildError::NonZeroExit { program, .. } => format!("{} task failed", program),
            other => other.to_string(),
        }
    }

    /// Body of a failure report: the captured output or the missing-path reason.
    pub fn message(&self) -> String {
        match self {
            BuildError::ToolchainNotLocated { variable, marker } => format!(
                "No entry of {} contains `{}`, or the matching directory does not exist",
                variable, marker
            ),
            BuildError::ExecutableNotFound { program, path } => {
                format!("Failed to find {} at {}", program, path.display())
            }
            BuildError::LaunchFailure { source, .. } | BuildError::Io { source, .. } => {
                source.to_string()
            }
            BuildError::NonZeroExit { output, .. } => output.clone(),
        }
    }

    /// Exit code of the failed child, if one ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BuildError::NonZeroExit { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// What the user can do about it, as a `help:` line.
    pub fn suggestion(&self) -> Option<String> {
        MietteDiagnostic::help(self).map(|help| format!("help: {}", help))
    }

    /// Convert to a user-facing diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        let diag = match self {
            BuildError::LaunchFailure { source, .. } | BuildError::Io { source, .. } => {
                diag.with_context(source.to_string())
            }
            BuildError::NonZeroExit { output, .. } => diag.with_context(output.trim_end()),
            BuildError::ToolchainNotLocated { .. } | BuildError::ExecutableNotFound { .. } => diag,
        };
        match self.suggestion() {
            Some(help) => diag.with_suggestion(help),
            None => diag,
        }
    }

    /// Log the failure with everything needed to diagnose it.
    pub fn log(&self) {
        match self {
            BuildError::NonZeroExit {
                program,
                action,
                args,
                exit_code,
                output,
            } => tracing::error!(
                "{} task failed (Action: {}, Args: {}) with return code {}. Error: {}",
                program,
                action,
                args,
                exit_code,
                output
            ),
            BuildError::LaunchFailure { source, .. } | BuildError::Io { source, .. } => {
                tracing::error!("{}: {}", self, source)
            }
            BuildError::ToolchainNotLocated { .. } | BuildError::ExecutableNotFound { .. } => {
                tracing::error!("{}", self)
            }
        }
    }
}

impl From<InvokeError> for BuildError {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::ExecutableNotFound { program, path } => {
                BuildError::ExecutableNotFound { program, path }
            }
            InvokeError::LaunchFailure { program, source } => {
                BuildError::LaunchFailure { program, source }
            }
            InvokeError::Io { program, source } => BuildError::Io { program, source },
        }
    }
}

/// Arguments for the companion build tool.
///
/// The configuration is appended only when given.
pub fn toolchain_args(
    action: BuildAction,
    config: Option<&BuildConfiguration>,
    layout: &ArtifactLayout,
    toolchain_executable: &Path,
) -> Vec<String> {
    let mut args = vec![
        "--Action".to_string(),
        action.as_str().to_string(),
        "--EngineDirectory".to_string(),
        path_arg(&layout.engine_dir),
        "--ProjectDirectory".to_string(),
        path_arg(&layout.project_dir),
        "--ProjectName".to_string(),
        layout.project_name.clone(),
        "--PluginDirectory".to_string(),
        path_arg(&layout.plugin_dir),
        "--DotNetPath".to_string(),
        path_arg(toolchain_executable),
        "--OutputPath".to_string(),
        path_arg(layout.assemblies_path()),
    ];

    if let Some(config) = config {
        args.push("--BuildConfig".to_string());
        args.push(config.as_str().to_string());
    }

    args
}

/// Arguments for the toolchain's `build` command.
pub fn bindings_args(config: &BuildConfiguration, output_dir: &Path) -> Vec<String> {
    vec![
        "build".to_string(),
        "-c".to_string(),
        config.as_str().to_string(),
        "--output".to_string(),
        path_arg(output_dir),
    ]
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// Runs build actions against one artifact layout.
///
/// Holds no state between calls; every action is a single request and
/// response.
pub struct Dispatcher<'a> {
    layout: &'a ArtifactLayout,
    settings: &'a ToolchainSettings,
    toolchain: Option<&'a ToolchainLocation>,
    run_mode: RunMode,
    invoker: &'a dyn Invoke,
    reporter: &'a dyn FailureReporter,
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher for an attended run with no toolchain located yet.
    pub fn new(
        layout: &'a ArtifactLayout,
        settings: &'a ToolchainSettings,
        invoker: &'a dyn Invoke,
        reporter: &'a dyn FailureReporter,
    ) -> Self {
        Dispatcher {
            layout,
            settings,
            toolchain: None,
            run_mode: RunMode::Attended,
            invoker,
            reporter,
        }
    }

    /// Use a located toolchain. `None` makes every action fail with
    /// [`BuildError::ToolchainNotLocated`].
    pub fn with_toolchain(mut self, toolchain: Option<&'a ToolchainLocation>) -> Self {
        self.toolchain = toolchain;
        self
    }

    pub fn with_run_mode(mut self, run_mode: RunMode) -> Self {
        self.run_mode = run_mode;
        self
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn layout(&self) -> &ArtifactLayout {
        self.layout
    }

    fn require_toolchain(&self) -> Result<&'a ToolchainLocation, BuildError> {
        self.toolchain.ok_or_else(|| BuildError::ToolchainNotLocated {
            variable: self.settings.path_variable().to_string(),
            marker: self.settings.marker().to_string(),
        })
    }

    /// Command running the companion build tool for `action`.
    pub fn toolchain_command(
        &self,
        action: BuildAction,
        config: Option<&BuildConfiguration>,
    ) -> Result<ProcessBuilder, BuildError> {
        let toolchain = self.require_toolchain()?;

        let config = match config {
            Some(config) if !action.accepts_configuration() => {
                tracing::debug!("{} takes no configuration; ignoring `{}`", action, config);
                None
            }
            config => config,
        };

        Ok(ProcessBuilder::new(self.layout.build_tool_path()).args(toolchain_args(
            action,
            config,
            self.layout,
            &toolchain.executable,
        )))
    }

    /// Command building the managed bindings with the toolchain itself.
    ///
    /// Output goes to the staging directory when unattended and to the
    /// assemblies directory otherwise.
    pub fn bindings_command(&self, config: &BuildConfiguration) -> Result<ProcessBuilder, BuildError> {
        let toolchain = self.require_toolchain()?;

        let output_dir = if self.run_mode.is_unattended() {
            self.layout.staging_dir.as_path()
        } else {
            self.layout.assemblies_path()
        };

        Ok(ProcessBuilder::new(&toolchain.executable)
            .args(bindings_args(config, output_dir))
            .cwd(self.layout.bindings_source_dir()))
    }

    /// Command for any action.
    pub fn command(
        &self,
        action: BuildAction,
        config: Option<&BuildConfiguration>,
    ) -> Result<ProcessBuilder, BuildError> {
        if action.uses_toolchain_directly() {
            let default = BuildConfiguration::default();
            self.bindings_command(config.unwrap_or(&default))
        } else {
            self.toolchain_command(action, config)
        }
    }

    /// Run an action without reporting.
    ///
    /// Failures are returned untouched; [`FailureReporter::report_error`]
    /// logs and surfaces them.
    pub fn execute(
        &self,
        action: BuildAction,
        config: Option<&BuildConfiguration>,
    ) -> Result<ProcessResult, BuildError> {
        self.command(action, config)
            .and_then(|cmd| self.run_command(action, &cmd))
    }

    fn run_command(&self, action: BuildAction, cmd: &ProcessBuilder) -> Result<ProcessResult, BuildError> {
        let program = cmd.program_name();
        let result = self.invoker.invoke(cmd)?;

        if !result.success() {
            return Err(BuildError::NonZeroExit {
                program,
                action,
                args: cmd.display_args(),
                exit_code: result.exit_code,
                output: result.output_lossy().into_owned(),
            });
        }

        tracing::info!(
            "{} with args ({}) took {:.2} seconds to execute.",
            program,
            cmd.display_args(),
            result.elapsed_seconds()
        );
        Ok(result)
    }

    /// Run an action and report any failure.
    pub fn run(
        &self,
        action: BuildAction,
        config: Option<&BuildConfiguration>,
    ) -> Result<ProcessResult, BuildError> {
        self.execute(action, config)
            .inspect_err(|e| self.reporter.report_error(e))
    }

    /// Run an action through the companion build tool.
    pub fn invoke_toolchain(&self, action: BuildAction, config: Option<&BuildConfiguration>) -> bool {
        self.run(action, config).is_ok()
    }

    /// Build the managed bindings.
    pub fn build_bindings(&self, config: &BuildConfiguration) -> bool {
        self.run(BuildAction::BuildBindings, Some(config)).is_ok()
    }

    pub fn build(&self, config: &BuildConfiguration) -> bool {
        self.invoke_toolchain(BuildAction::Build, Some(config))
    }

    pub fn rebuild(&self, config: &BuildConfiguration) -> bool {
        self.invoke_toolchain(BuildAction::Rebuild, Some(config))
    }

    pub fn clean(&self) -> bool {
        self.invoke_toolchain(BuildAction::Clean, None)
    }

    pub fn generate_project(&self) -> bool {
        self.invoke_toolchain(BuildAction::GenerateProject, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        virtual_roots, MockOutcome, MockProcessOutput, RecordingInvoker, RecordingReporter,
    };

    struct Harness {
        layout: ArtifactLayout,
        settings: ToolchainSettings,
        toolchain: ToolchainLocation,
        invoker: RecordingInvoker,
        reporter: RecordingReporter,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                layout: ArtifactLayout::from_roots(&virtual_roots()),
                settings: ToolchainSettings::default(),
                toolchain: ToolchainLocation::new("/usr/share/dotnet", "dotnet"),
                invoker: RecordingInvoker::new(),
                reporter: RecordingReporter::new(),
            }
        }

        fn dispatcher(&self) -> Dispatcher<'_> {
            Dispatcher::new(&self.layout, &self.settings, &self.invoker, &self.reporter)
                .with_toolchain(Some(&self.toolchain))
        }
    }

    #[test]
    fn test_clean_has_no_build_config() {
        let h = Harness::new();
        assert!(h.dispatcher().clean());

        let call = h.invoker.last_call().unwrap();
        assert_eq!(call.program, h.layout.build_tool_path());
        assert_eq!(call.flag_value("--Action"), Some("Clean"));
        assert!(!call.has_flag("--BuildConfig"));
    }

    #[test]
    fn test_build_release_args() {
        let h = Harness::new();
        assert!(h.dispatcher().build(&BuildConfiguration::new("Release")));

        let call = h.invoker.last_call().unwrap();
        assert_eq!(call.flag_value("--Action"), Some("Build"));
        assert_eq!(call.flag_value("--BuildConfig"), Some("Release"));
        assert_eq!(call.flag_value("--ProjectName"), Some("Shooter"));
        assert_eq!(call.flag_value("--DotNetPath"), Some("/usr/share/dotnet/dotnet"));
        assert_eq!(
            call.flag_value("--OutputPath"),
            Some("/work/Shooter/Plugins/UnrealSharp/Binaries/DotNet/net8.0")
        );
    }

    #[test]
    fn test_every_path_argument_is_absolute() {
        let h = Harness::new();
        h.dispatcher().rebuild(&BuildConfiguration::default());

        let call = h.invoker.last_call().unwrap();
        for flag in [
            "--EngineDirectory",
            "--ProjectDirectory",
            "--PluginDirectory",
            "--DotNetPath",
            "--OutputPath",
        ] {
            let value = call.flag_value(flag).unwrap();
            assert!(Path::new(value).is_absolute(), "{} = {}", flag, value);
        }
    }

    #[test]
    fn test_generate_project_ignores_configuration() {
        let h = Harness::new();
        let release = BuildConfiguration::new("Release");
        assert!(h
            .dispatcher()
            .invoke_toolchain(BuildAction::GenerateProject, Some(&release)));

        let call = h.invoker.last_call().unwrap();
        assert_eq!(call.flag_value("--Action"), Some("GenerateProject"));
        assert!(!call.has_flag("--BuildConfig"));
    }

    #[test]
    fn test_bindings_output_follows_run_mode() {
        let h = Harness::new();
        let config = BuildConfiguration::new("Debug");

        assert!(h.dispatcher().build_bindings(&config));
        assert!(h
            .dispatcher()
            .with_run_mode(RunMode::Unattended)
            .build_bindings(&config));

        let calls = h.invoker.calls();
        let (attended, unattended) = (&calls[0], &calls[1]);

        assert_eq!(attended.program, h.toolchain.executable);
        assert_eq!(attended.cwd, Some(h.layout.bindings_source_dir()));
        assert_eq!(&attended.args[..3], ["build", "-c", "Debug"]);
        assert_eq!(
            attended.flag_value("--output"),
            Some(h.layout.assemblies_path().to_str().unwrap())
        );
        assert_eq!(
            unattended.flag_value("--output"),
            Some(h.layout.staging_dir.to_str().unwrap())
        );

        // Only the output directory differs.
        let strip = |args: &[String]| -> Vec<String> {
            args.iter().take(args.len() - 1).cloned().collect()
        };
        assert_eq!(strip(&attended.args[..]), strip(&unattended.args[..]));
        assert_eq!(attended.program, unattended.program);
        assert_eq!(attended.cwd, unattended.cwd);
    }

    #[test]
    fn test_non_zero_exit_is_reported() {
        let h = Harness::new();
        h.invoker
            .push(MockProcessOutput::failure(7, "Restoring...\nerror CS1002: ; expected"));

        let dispatcher = h.dispatcher();
        let err = dispatcher
            .run(BuildAction::Build, Some(&BuildConfiguration::default()))
            .unwrap_err();

        assert_eq!(err.exit_code(), Some(7));
        assert!(err.to_string().contains("with return code 7"));

        let reports = h.reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "UnrealSharpBuildTool task failed");
        assert!(reports[0].1.contains("error CS1002"));
    }

    #[test]
    fn test_missing_toolchain() {
        let h = Harness::new();
        let dispatcher =
            Dispatcher::new(&h.layout, &h.settings, &h.invoker, &h.reporter).with_toolchain(None);

        let err = dispatcher.execute(BuildAction::Clean, None).unwrap_err();
        assert!(matches!(err, BuildError::ToolchainNotLocated { .. }));
        assert!(h.invoker.calls().is_empty());
        // execute never reports
        assert!(h.reporter.reports().is_empty());

        assert!(!dispatcher.generate_project());
        assert_eq!(h.reporter.reports().len(), 1);
    }

    #[test]
    fn test_missing_build_tool_is_reported() {
        let h = Harness::new();
        h.invoker.push_outcome(MockOutcome::NotFound);

        assert!(!h.dispatcher().clean());

        let reports = h.reporter.reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].1.starts_with("Failed to find UnrealSharpBuildTool at "));
    }

    #[test]
    fn test_launch_failure_is_reported() {
        let h = Harness::new();
        h.invoker.push_outcome(MockOutcome::LaunchFailure);

        let err = h
            .dispatcher()
            .run(BuildAction::BuildBindings, None)
            .unwrap_err();
        assert!(matches!(err, BuildError::LaunchFailure { .. }));
        assert_eq!(h.reporter.reports()[0].0, "dotnet failed to launch");
    }

    #[test]
    fn test_bindings_default_configuration() {
        let h = Harness::new();
        h.dispatcher().execute(BuildAction::BuildBindings, None).unwrap();

        let call = h.invoker.last_call().unwrap();
        assert_eq!(call.flag_value("-c"), Some("Debug"));
    }

    #[test]
    fn test_diagnostic_carries_output() {
        let err = BuildError::NonZeroExit {
            program: "UnrealSharpBuildTool".to_string(),
            action: BuildAction::Build,
            args: "--Action Build".to_string(),
            exit_code: 1,
            output: "line one\nline two\n".to_string(),
        };
        let text = err.to_diagnostic().format(false);
        assert!(text.contains("  | line two\n"));
        assert!(text.contains("help: Run with --verbose for the full tool output"));
    }

    #[test]
    fn test_missing_toolchain_suggests_install() {
        let err = BuildError::ToolchainNotLocated {
            variable: "PATH".to_string(),
            marker: "dotnet".to_string(),
        };
        let help = err.suggestion().unwrap();
        assert!(help.starts_with("help: Install the .NET SDK and add its directory to PATH"));
        assert_eq!(
            MietteDiagnostic::code(&err).map(|code| code.to_string()).as_deref(),
            Some("sharpbuild::toolchain::not_located")
        );

        let text = err.to_diagnostic().format(false);
        assert!(text.contains("no usable entry of PATH contains `dotnet`"));
        assert!(text.contains(&help));

        let err = BuildError::Io {
            program: "dotnet".to_string(),
            source: io::Error::other("broken pipe"),
        };
        assert_eq!(err.suggestion(), None);
        assert!(err.to_diagnostic().format(false).contains("  | broken pipe"));
    }
}
