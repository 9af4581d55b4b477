//! Test fixtures for common test scenarios.
//!
//! [`ProjectFixture`] lays out a host project with the plugin directory
//! structure on disk, optionally with a fake toolchain install.

use std::path::{Path, PathBuf};

use crate::core::layout::{ArtifactLayout, ProjectRoots, BUILD_TOOL_NAME};

/// Fixture for a complete project structure.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    /// Project name.
    pub name: String,
    /// Write the companion build tool into the assemblies directory.
    pub with_build_tool: bool,
    /// SDK versions to install into a fake toolchain directory.
    pub sdks: Vec<String>,
}

impl ProjectFixture {
    /// Create a new project fixture with only a `.uproject` file.
    pub fn new(name: impl Into<String>) -> Self {
        ProjectFixture {
            name: name.into(),
            with_build_tool: false,
            sdks: Vec::new(),
        }
    }

    /// Include the companion build tool.
    pub fn with_build_tool(mut self) -> Self {
        self.with_build_tool = true;
        self
    }

    /// Install a fake toolchain with the given SDK version.
    pub fn with_sdk(mut self, version: impl Into<String>) -> Self {
        self.sdks.push(version.into());
        self
    }

    /// Write the fixture under `root` and return its roots.
    pub fn write(&self, root: &Path) -> std::io::Result<ProjectRoots> {
        let project_dir = root.join(&self.name);
        std::fs::create_dir_all(&project_dir)?;
        std::fs::write(
            project_dir.join(format!("{}.uproject", self.name)),
            "{\n  \"FileVersion\": 3\n}\n",
        )?;

        let engine_dir = root.join("Engine");
        std::fs::create_dir_all(&engine_dir)?;

        let roots = ProjectRoots {
            engine_dir,
            plugin_dir: project_dir.join("Plugins").join("UnrealSharp"),
            project_dir,
            project_name: self.name.clone(),
            platform: "Linux".to_string(),
            framework: "net8.0".to_string(),
        };

        let layout = ArtifactLayout::from_roots(&roots);
        std::fs::create_dir_all(layout.bindings_source_dir())?;
        std::fs::create_dir_all(layout.assemblies_path())?;

        if self.with_build_tool {
            std::fs::write(layout.build_tool_path(), "")?;
        }

        for version in &self.sdks {
            std::fs::create_dir_all(self.toolchain_dir(root).join("sdk").join(version))?;
        }

        Ok(roots)
    }

    /// Directory of the fake toolchain install.
    pub fn toolchain_dir(&self, root: &Path) -> PathBuf {
        root.join("tools").join("dotnet")
    }
}

/// Roots that exist nowhere on disk.
pub fn virtual_roots() -> ProjectRoots {
    ProjectRoots {
        engine_dir: PathBuf::from("/engine"),
        project_dir: PathBuf::from("/work/Shooter"),
        project_name: "Shooter".to_string(),
        plugin_dir: PathBuf::from("/work/Shooter/Plugins/UnrealSharp"),
        platform: "Linux".to_string(),
        framework: "net8.0".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_fixture_layout() {
        let tmp = TempDir::new().unwrap();
        let fixture = ProjectFixture::new("Shooter")
            .with_build_tool()
            .with_sdk("8.0.100");
        let roots = fixture.write(tmp.path()).unwrap();

        assert!(roots.project_dir.join("Shooter.uproject").is_file());
        let layout = ArtifactLayout::from_roots(&roots);
        assert!(layout.build_tool_path().is_file());
        assert!(layout
            .build_tool_path()
            .to_string_lossy()
            .contains(BUILD_TOOL_NAME));
        assert!(fixture
            .toolchain_dir(tmp.path())
            .join("sdk/8.0.100")
            .is_dir());
    }
}
