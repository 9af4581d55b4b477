//! Fixed artifact layout of the plugin and the host project.
//!
//! Every path here is derived by joining onto a small set of roots. Nothing
//! touches the filesystem, so identical roots always yield identical paths.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// File name of the companion build tool, without platform suffix.
pub const BUILD_TOOL_NAME: &str = "UnrealSharpBuildTool";

/// Managed plugin library loaded by the host.
pub const PLUGIN_LIBRARY_NAME: &str = "UnrealSharp.Plugins.dll";

/// Runtime configuration consumed by the host fxr.
pub const RUNTIME_CONFIG_NAME: &str = "UnrealSharp.runtimeconfig.json";

/// Prefix of the user's managed project name.
pub const USER_PROJECT_PREFIX: &str = "Managed";

/// Root inputs the layout is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRoots {
    /// Engine installation directory
    pub engine_dir: PathBuf,
    /// Host project directory (contains the `.uproject`)
    pub project_dir: PathBuf,
    /// Host project name
    pub project_name: String,
    /// Plugin base directory
    pub plugin_dir: PathBuf,
    /// Platform name used for staged builds (e.g. "Windows")
    pub platform: String,
    /// Target framework moniker of the compiled assemblies (e.g. "net8.0")
    pub framework: String,
}

impl ProjectRoots {
    /// Convert every root directory to an absolute path.
    ///
    /// Uses the current directory for relative roots but does not require
    /// the directories to exist.
    pub fn into_absolute(self) -> io::Result<Self> {
        Ok(ProjectRoots {
            engine_dir: std::path::absolute(&self.engine_dir)?,
            project_dir: std::path::absolute(&self.project_dir)?,
            plugin_dir: std::path::absolute(&self.plugin_dir)?,
            ..self
        })
    }
}

/// All directories and files the build actions read or produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactLayout {
    pub project_name: String,
    pub plugin_dir: PathBuf,
    pub project_dir: PathBuf,
    pub engine_dir: PathBuf,
    /// Compiled assemblies of the plugin (`<plugin>/Binaries/DotNet/<framework>`)
    pub output_dir: PathBuf,
    /// Unattended build output (`<project>/Saved/StagedBuilds/<platform>`)
    pub staging_dir: PathBuf,
    /// User build output (`<project>/Binaries/UnrealSharp`)
    pub user_assembly_dir: PathBuf,
    /// Generated glue sources (`<plugin>/Managed/UnrealSharp/UnrealSharp/Generated`)
    pub generated_classes_dir: PathBuf,
}

impl ArtifactLayout {
    /// Derive the layout from its roots.
    pub fn from_roots(roots: &ProjectRoots) -> Self {
        ArtifactLayout {
            project_name: roots.project_name.clone(),
            plugin_dir: roots.plugin_dir.clone(),
            project_dir: roots.project_dir.clone(),
            engine_dir: roots.engine_dir.clone(),
            output_dir: assemblies_dir(&roots.plugin_dir, &roots.framework),
            staging_dir: staging_dir(&roots.project_dir, &roots.platform),
            user_assembly_dir: user_assembly_dir(&roots.project_dir),
            generated_classes_dir: generated_classes_dir(&roots.plugin_dir),
        }
    }

    /// Directory holding the plugin's compiled assemblies.
    pub fn assemblies_path(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the companion build tool.
    pub fn build_tool_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}{}", BUILD_TOOL_NAME, std::env::consts::EXE_SUFFIX))
    }

    pub fn plugin_library_path(&self) -> PathBuf {
        self.output_dir.join(PLUGIN_LIBRARY_NAME)
    }

    pub fn runtime_config_path(&self) -> PathBuf {
        self.output_dir.join(RUNTIME_CONFIG_NAME)
    }

    /// Name of the user's managed project (`Managed<ProjectName>`).
    pub fn user_project_name(&self) -> String {
        format!("{}{}", USER_PROJECT_PREFIX, self.project_name)
    }

    /// The user's compiled assembly.
    pub fn user_assembly_path(&self) -> PathBuf {
        self.user_assembly_dir
            .join(format!("{}.dll", self.user_project_name()))
    }

    /// Root of the plugin's managed sources.
    pub fn managed_source_dir(&self) -> PathBuf {
        self.plugin_dir.join("Managed")
    }

    /// The managed bindings solution, used as working directory for bindings builds.
    pub fn bindings_source_dir(&self) -> PathBuf {
        self.managed_source_dir().join("UnrealSharp")
    }

    /// User scripts of the host project.
    pub fn script_dir(&self) -> PathBuf {
        self.project_dir.join("Script")
    }
}

/// `<plugin>/Binaries/DotNet/<framework>`
pub fn assemblies_dir(plugin_dir: &Path, framework: &str) -> PathBuf {
    plugin_dir.join("Binaries").join("DotNet").join(framework)
}

/// `<project>/Saved/StagedBuilds/<platform>`
pub fn staging_dir(project_dir: &Path, platform: &str) -> PathBuf {
    project_dir.join("Saved").join("StagedBuilds").join(platform)
}

/// `<project>/Binaries/UnrealSharp`
pub fn user_assembly_dir(project_dir: &Path) -> PathBuf {
    project_dir.join("Binaries").join("UnrealSharp")
}

/// `<plugin>/Managed/UnrealSharp/UnrealSharp/Generated`
pub fn generated_classes_dir(plugin_dir: &Path) -> PathBuf {
    plugin_dir
        .join("Managed")
        .join("UnrealSharp")
        .join("UnrealSharp")
        .join("Generated")
}

/// Platform name used by the engine for the host OS.
pub fn host_platform_name() -> &'static str {
    match std::env::consts::OS {
        "windows" => "Windows",
        "macos" => "Mac",
        _ => "Linux",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots() -> ProjectRoots {
        ProjectRoots {
            engine_dir: PathBuf::from("/engine"),
            project_dir: PathBuf::from("/work/Shooter"),
            project_name: "Shooter".to_string(),
            plugin_dir: PathBuf::from("/work/Shooter/Plugins/UnrealSharp"),
            platform: "Linux".to_string(),
            framework: "net8.0".to_string(),
        }
    }

    #[test]
    fn test_layout_paths() {
        let layout = ArtifactLayout::from_roots(&roots());

        assert_eq!(
            layout.output_dir,
            PathBuf::from("/work/Shooter/Plugins/UnrealSharp/Binaries/DotNet/net8.0")
        );
        assert_eq!(
            layout.staging_dir,
            PathBuf::from("/work/Shooter/Saved/StagedBuilds/Linux")
        );
        assert_eq!(
            layout.user_assembly_path(),
            PathBuf::from("/work/Shooter/Binaries/UnrealSharp/ManagedShooter.dll")
        );
        assert_eq!(
            layout.generated_classes_dir,
            PathBuf::from(
                "/work/Shooter/Plugins/UnrealSharp/Managed/UnrealSharp/UnrealSharp/Generated"
            )
        );
        assert_eq!(
            layout.bindings_source_dir(),
            PathBuf::from("/work/Shooter/Plugins/UnrealSharp/Managed/UnrealSharp")
        );
        assert_eq!(layout.script_dir(), PathBuf::from("/work/Shooter/Script"));
    }

    #[test]
    fn test_layout_is_deterministic() {
        // Roots that exist nowhere on disk still produce the same layout every time.
        let roots = ProjectRoots {
            project_dir: PathBuf::from("/definitely/not/here"),
            ..roots()
        };
        let first = ArtifactLayout::from_roots(&roots);
        let second = ArtifactLayout::from_roots(&roots);

        assert_eq!(first, second);
        assert_eq!(first.assemblies_path(), second.assemblies_path());
        assert_eq!(first.user_assembly_path(), second.user_assembly_path());
        assert_eq!(first.staging_dir, second.staging_dir);
    }

    #[test]
    fn test_build_tool_path() {
        let layout = ArtifactLayout::from_roots(&roots());
        let tool = layout.build_tool_path();

        assert!(tool.starts_with(layout.assemblies_path()));
        assert!(tool
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(BUILD_TOOL_NAME));
        assert_eq!(
            layout.plugin_library_path().file_name().unwrap(),
            PLUGIN_LIBRARY_NAME
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_into_absolute() {
        let relative = ProjectRoots {
            project_dir: PathBuf::from("Shooter"),
            ..roots()
        };
        let absolute = relative.into_absolute().unwrap();

        assert!(absolute.project_dir.is_absolute());
        assert!(absolute.project_dir.ends_with("Shooter"));
        assert_eq!(absolute.engine_dir, PathBuf::from("/engine"));
    }
}
