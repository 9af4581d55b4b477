//! Environment and toolchain health checks.
//!
//! The `doctor` command performs fast environment checks to verify that the
//! toolchain can be located and that the project has the directories and
//! companion build tool every build action relies on.
//!
//! ## Usage
//!
//! ```bash
//! sharpbuild doctor           # Quick check
//! sharpbuild doctor --verbose # Detailed output
//! ```
//!
//! ## Checks Performed
//!
//! - Toolchain located through the search-path variable
//! - Installed SDK versions (and the configured requirement, if any)
//! - Toolchain executable runs (`dotnet --version`)
//! - Runtime host library (optional)
//! - Engine, project and plugin directories
//! - Companion build tool
//! - Executable reachable through `PATH` (optional)

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::core::layout::ArtifactLayout;
use crate::toolchain::ToolchainLocation;
use crate::util::config::ToolchainSettings;
use crate::util::process::{find_executable, Invoke, ProcessBuilder};

/// Result of a single health check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,

    /// Whether the check passed
    pub passed: bool,

    /// Human-readable status message
    pub message: String,

    /// Path to the tool or directory (if applicable)
    pub path: Option<PathBuf>,

    /// Version string (if applicable)
    pub version: Option<String>,

    /// How long the check took
    pub duration: Duration,

    /// Whether this check is required or optional
    pub required: bool,
}

impl CheckResult {
    /// Create a passing check result.
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: true,
            message: message.into(),
            path: None,
            version: None,
            duration: Duration::ZERO,
            required: true,
        }
    }

    /// Create a failing check result.
    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            passed: false,
            ..CheckResult::pass(name, message)
        }
    }

    /// Mark this check as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set the path.
    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    /// Set the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Summary of all health checks.
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    /// Individual check results
    pub checks: Vec<CheckResult>,

    /// Total time taken
    pub total_duration: Duration,

    /// Environment information
    pub environment: HashMap<String, String>,
}

impl DoctorReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        DoctorReport::default()
    }

    /// Add a check result.
    pub fn add(&mut self, check: CheckResult) {
        self.checks.push(check);
    }

    /// Check if all required checks passed.
    pub fn all_required_passed(&self) -> bool {
        self.checks.iter().filter(|c| c.required).all(|c| c.passed)
    }

    /// Get the count of passed checks.
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    /// Get the count of failed checks.
    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }

    /// Get the count of required failed checks.
    pub fn required_failed_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.required && !c.passed)
            .count()
    }

    /// Look a check up by name.
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Inputs for the doctor command.
pub struct DoctorOptions<'a> {
    /// Toolchain discovery settings
    pub settings: &'a ToolchainSettings,

    /// Artifact layout, when the project roots could be resolved
    pub layout: Option<&'a ArtifactLayout>,

    /// Runs `dotnet --version`
    pub invoker: &'a dyn Invoke,
}

/// Run the doctor command.
pub fn doctor(options: DoctorOptions<'_>) -> DoctorReport {
    let start = Instant::now();
    let mut report = DoctorReport::new();

    report
        .environment
        .insert("os".to_string(), std::env::consts::OS.to_string());
    report
        .environment
        .insert("arch".to_string(), std::env::consts::ARCH.to_string());
    report.environment.insert(
        "path-variable".to_string(),
        options.settings.path_variable().to_string(),
    );
    report
        .environment
        .insert("marker".to_string(), options.settings.marker().to_string());

    let (check, location) = check_toolchain(options.settings);
    report.add(check);

    match &location {
        Some(location) => {
            report.add(check_sdks(location, options.settings));
            report.add(check_toolchain_runs(location, options.invoker));
            report.add(check_runtime_host(location, options.settings));
        }
        None => report.add(CheckResult::fail(
            "Toolchain Executable",
            "Skipped: toolchain not located",
        )),
    }

    match options.layout {
        Some(layout) => {
            report.add(check_dir("Engine Directory", &layout.engine_dir));
            report.add(check_dir("Project Directory", &layout.project_dir));
            report.add(check_dir("Plugin Directory", &layout.plugin_dir));
            report.add(check_build_tool(layout));
        }
        None => report.add(CheckResult::fail(
            "Project",
            "Project roots could not be resolved (engine directory or project name missing)",
        )),
    }

    report.add(check_on_path(options.settings.executable()));

    report.total_duration = start.elapsed();
    report
}

/// Locate the toolchain through the search-path variable.
fn check_toolchain(settings: &ToolchainSettings) -> (CheckResult, Option<ToolchainLocation>) {
    let start = Instant::now();

    match ToolchainLocation::locate(settings) {
        Some(location) => {
            let check = CheckResult::pass(
                "Toolchain",
                format!("Found in {}", settings.path_variable()),
            )
            .with_path(location.sdk_dir.clone())
            .with_duration(start.elapsed());
            (check, Some(location))
        }
        None => {
            let check = CheckResult::fail(
                "Toolchain",
                format!(
                    "No existing entry of {} contains `{}`",
                    settings.path_variable(),
                    settings.marker()
                ),
            )
            .with_duration(start.elapsed());
            (check, None)
        }
    }
}

/// List installed SDKs.
fn check_sdks(location: &ToolchainLocation, settings: &ToolchainSettings) -> CheckResult {
    let start = Instant::now();
    let sdks = location.installed_sdks();

    if sdks.is_empty() {
        return CheckResult::fail(
            "SDK",
            format!("No SDK installed under {}", location.sdk_dir.join("sdk").display()),
        )
        .with_duration(start.elapsed());
    }

    let versions = sdks
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let message = match &settings.sdk_version {
        Some(req) => format!("{} installed (requires {})", sdks.len(), req),
        None => format!("{} installed", sdks.len()),
    };

    CheckResult::pass("SDK", message)
        .with_version(versions)
        .with_duration(start.elapsed())
}

/// Run the toolchain executable once.
fn check_toolchain_runs(location: &ToolchainLocation, invoker: &dyn Invoke) -> CheckResult {
    let start = Instant::now();
    let cmd = ProcessBuilder::new(&location.executable).arg("--version");

    match invoker.invoke(&cmd) {
        Ok(result) if result.success() => {
            let version = result
                .output_lossy()
                .lines()
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            CheckResult::pass("Toolchain Executable", "Runs")
                .with_path(location.executable.clone())
                .with_version(version)
                .with_duration(start.elapsed())
        }
        Ok(result) => CheckResult::fail(
            "Toolchain Executable",
            format!("`--version` exited with code {}", result.exit_code),
        )
        .with_path(location.executable.clone())
        .with_duration(start.elapsed()),
        Err(e) => CheckResult::fail("Toolchain Executable", e.to_string())
            .with_path(location.executable.clone())
            .with_duration(start.elapsed()),
    }
}

/// Find the runtime host library.
fn check_runtime_host(location: &ToolchainLocation, settings: &ToolchainSettings) -> CheckResult {
    let start = Instant::now();

    match location.runtime_host_path(settings.hostfxr_version.as_deref()) {
        Some(path) if path.is_file() => CheckResult::pass("Runtime Host", "Found")
            .with_path(path)
            .with_duration(start.elapsed())
            .optional(),
        Some(path) => CheckResult::fail("Runtime Host", "Library missing")
            .with_path(path)
            .with_duration(start.elapsed())
            .optional(),
        None => CheckResult::fail("Runtime Host", "No host fxr version installed")
            .with_duration(start.elapsed())
            .optional(),
    }
}

fn check_dir(name: &str, dir: &Path) -> CheckResult {
    if dir.is_dir() {
        CheckResult::pass(name, "Exists").with_path(dir.to_path_buf())
    } else {
        CheckResult::fail(name, "Does not exist").with_path(dir.to_path_buf())
    }
}

/// Check for the companion build tool.
fn check_build_tool(layout: &ArtifactLayout) -> CheckResult {
    let path = layout.build_tool_path();
    if path.is_file() {
        CheckResult::pass("Build Tool", "Found").with_path(path)
    } else {
        CheckResult::fail(
            "Build Tool",
            "Not found (build the plugin's managed projects first)",
        )
        .with_path(path)
    }
}

/// Check whether the executable is also reachable through `PATH`.
fn check_on_path(executable: &str) -> CheckResult {
    let start = Instant::now();

    match find_executable(executable) {
        Some(path) => CheckResult::pass("PATH", format!("{} is on PATH", executable))
            .with_path(path)
            .with_duration(start.elapsed())
            .optional(),
        None => CheckResult::fail("PATH", format!("{} is not on PATH", executable))
            .with_duration(start.elapsed())
            .optional(),
    }
}

/// Format the doctor report for display.
pub fn format_report(report: &DoctorReport, verbose: bool) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    let unknown = "unknown".to_string();

    let _ = writeln!(output, "sharpbuild doctor");
    let _ = writeln!(output, "=================\n");

    if verbose {
        let _ = writeln!(output, "Environment:");
        let _ = writeln!(
            output,
            "  OS: {} ({})",
            report.environment.get("os").unwrap_or(&unknown),
            report.environment.get("arch").unwrap_or(&unknown)
        );
        let _ = writeln!(
            output,
            "  Search path: {} (marker `{}`)",
            report.environment.get("path-variable").unwrap_or(&unknown),
            report.environment.get("marker").unwrap_or(&unknown)
        );
        let _ = writeln!(output);
    }

    let _ = writeln!(output, "Checks:");
    for check in &report.checks {
        let status = if check.passed { "[OK]" } else { "[!!]" };
        let required = if check.required { "" } else { " (optional)" };

        let _ = writeln!(output, "  {} {}{}", status, check.name, required);

        if verbose || !check.passed {
            let _ = writeln!(output, "      {}", check.message);
        }
        if verbose {
            if let Some(path) = &check.path {
                let _ = writeln!(output, "      Path: {}", path.display());
            }
            if let Some(version) = &check.version {
                let _ = writeln!(output, "      Version: {}", version);
            }
        }
    }

    let _ = writeln!(output);

    let passed = report.passed_count();
    let failed = report.failed_count();
    let required_failed = report.required_failed_count();

    let _ = writeln!(output, "Summary: {} passed, {} failed", passed, failed);

    if required_failed > 0 {
        let _ = writeln!(
            output,
            "\nWarning: {} required check(s) failed. Build actions will not work.",
            required_failed
        );
    } else if failed > 0 {
        let _ = writeln!(
            output,
            "\nAll required checks passed. {} optional check(s) failed.",
            failed
        );
    } else {
        let _ = writeln!(output, "\nAll checks passed. sharpbuild is ready to use.");
    }

    output
}
