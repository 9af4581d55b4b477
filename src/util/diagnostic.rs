//! User-friendly diagnostic messages.
//!
//! Every failure shown to the user carries the tool involved, the reason,
//! and where possible a next step.

use std::fmt;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no engine directory is configured.
    pub const ENGINE_DIR_MISSING: &str =
        "help: Pass --engine-dir or set [project].engine-dir in .sharpbuild/config.toml";

    /// Suggestion when no project name can be derived.
    pub const PROJECT_NAME_MISSING: &str =
        "help: Pass --project-name or set [project].name in .sharpbuild/config.toml";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional details and suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional detail lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    /// Add context to the diagnostic. Multi-line text becomes several lines.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context
            .extend(context.lines().map(|line| line.to_string()));
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = match (color, self.severity) {
            (true, Severity::Error) => "\x1b[1;31merror\x1b[0m".to_string(),
            (true, Severity::Warning) => "\x1b[1;33mwarning\x1b[0m".to_string(),
            (false, severity) => severity.to_string(),
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        for ctx in &self.context {
            output.push_str(&format!("  | {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            for suggestion in &self.suggestions {
                output.push_str(&format!("{}\n", suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_format() {
        let diag = Diagnostic::error("UnrealSharpBuildTool task failed")
            .with_context("Restore complete\nerror CS0103: name does not exist")
            .with_suggestion(suggestions::ENGINE_DIR_MISSING);

        let text = diag.format(false);
        assert!(text.starts_with("error: UnrealSharpBuildTool task failed\n"));
        assert!(text.contains("  | Restore complete\n"));
        assert!(text.contains("  | error CS0103: name does not exist\n"));
        assert!(text.ends_with(&format!("\n{}\n", suggestions::ENGINE_DIR_MISSING)));
    }

    #[test]
    fn test_diagnostic_color() {
        let text = Diagnostic::warning("careful").format(true);
        assert!(text.contains("\x1b[1;33mwarning\x1b[0m: careful"));
        assert_eq!(Diagnostic::warning("careful").to_string(), "warning: careful\n");
    }
}
