//! Build actions, configurations and run modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A build operation requested of the companion build tool or the toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildAction {
    Build,
    Rebuild,
    Clean,
    GenerateProject,
    BuildBindings,
}

impl BuildAction {
    /// All actions, in declaration order.
    pub const ALL: [BuildAction; 5] = [
        BuildAction::Build,
        BuildAction::Rebuild,
        BuildAction::Clean,
        BuildAction::GenerateProject,
        BuildAction::BuildBindings,
    ];

    /// The name passed to the build tool via `--Action`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildAction::Build => "Build",
            BuildAction::Rebuild => "Rebuild",
            BuildAction::Clean => "Clean",
            BuildAction::GenerateProject => "GenerateProject",
            BuildAction::BuildBindings => "BuildBindings",
        }
    }

    /// Whether a build configuration is forwarded for this action.
    ///
    /// `Clean` and `GenerateProject` never take one.
    pub fn accepts_configuration(&self) -> bool {
        !matches!(self, BuildAction::Clean | BuildAction::GenerateProject)
    }

    /// Whether this action runs the toolchain itself rather than the build tool.
    pub fn uses_toolchain_directly(&self) -> bool {
        matches!(self, BuildAction::BuildBindings)
    }
}

impl fmt::Display for BuildAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildAction::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown build action '{}'; expected one of: Build, Rebuild, Clean, GenerateProject, BuildBindings",
                    s
                )
            })
    }
}

/// A build configuration tag such as `Debug` or `Release`.
///
/// The value is opaque and passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildConfiguration(String);

impl BuildConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        BuildConfiguration(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BuildConfiguration {
    fn default() -> Self {
        BuildConfiguration::new("Debug")
    }
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BuildConfiguration {
    fn from(s: &str) -> Self {
        BuildConfiguration::new(s)
    }
}

impl From<String> for BuildConfiguration {
    fn from(s: String) -> Self {
        BuildConfiguration(s)
    }
}

/// Whether an interactive user is present.
///
/// Resolved once at startup and threaded through explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// A user can acknowledge failure prompts.
    #[default]
    Attended,
    /// Headless or CI: prompts degrade to logging, bindings go to staging.
    Unattended,
}

impl RunMode {
    pub fn from_unattended(unattended: bool) -> Self {
        if unattended {
            RunMode::Unattended
        } else {
            RunMode::Attended
        }
    }

    pub fn is_unattended(&self) -> bool {
        matches!(self, RunMode::Unattended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names() {
        assert_eq!(BuildAction::Build.to_string(), "Build");
        assert_eq!(BuildAction::GenerateProject.as_str(), "GenerateProject");
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("clean".parse::<BuildAction>().unwrap(), BuildAction::Clean);
        assert_eq!(
            "GenerateProject".parse::<BuildAction>().unwrap(),
            BuildAction::GenerateProject
        );
        assert!("deploy".parse::<BuildAction>().is_err());
    }

    #[test]
    fn test_configuration_acceptance() {
        assert!(BuildAction::Build.accepts_configuration());
        assert!(BuildAction::Rebuild.accepts_configuration());
        assert!(BuildAction::BuildBindings.accepts_configuration());
        assert!(!BuildAction::Clean.accepts_configuration());
        assert!(!BuildAction::GenerateProject.accepts_configuration());
    }

    #[test]
    fn test_run_mode() {
        assert_eq!(RunMode::from_unattended(true), RunMode::Unattended);
        assert!(!RunMode::default().is_unattended());
    }
}
