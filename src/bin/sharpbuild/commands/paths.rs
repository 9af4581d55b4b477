//! `sharpbuild paths` command
//!
//! Prints every path the build actions read or write.

use anyhow::Result;
use serde_json::json;

use super::Session;
use crate::cli::PathsArgs;
use crate::GlobalOptions;
use sharpbuild::toolchain::ToolchainLocation;

pub fn execute(args: PathsArgs, opts: &GlobalOptions) -> Result<()> {
    let session = Session::open(opts)?;
    let layout = session.layout(opts)?;
    let settings = &session.config.toolchain;
    let toolchain = ToolchainLocation::locate_cached(settings);
    let runtime_host = toolchain
        .as_ref()
        .and_then(|t| t.runtime_host_path(settings.hostfxr_version.as_deref()));

    if args.json {
        opts.shell.json_event(&json!({
            "layout": layout,
            "build_tool": layout.build_tool_path(),
            "plugin_library": layout.plugin_library_path(),
            "runtime_config": layout.runtime_config_path(),
            "user_assembly": layout.user_assembly_path(),
            "managed_source_dir": layout.managed_source_dir(),
            "bindings_source_dir": layout.bindings_source_dir(),
            "script_dir": layout.script_dir(),
            "toolchain": toolchain,
            "runtime_host": runtime_host,
        }));
        return Ok(());
    }

    let rows = [
        ("Project", layout.project_dir.clone()),
        ("Engine", layout.engine_dir.clone()),
        ("Plugin", layout.plugin_dir.clone()),
        ("Assemblies", layout.output_dir.clone()),
        ("Build tool", layout.build_tool_path()),
        ("Plugin library", layout.plugin_library_path()),
        ("Runtime config", layout.runtime_config_path()),
        ("User assembly", layout.user_assembly_path()),
        ("Staging", layout.staging_dir.clone()),
        ("Generated", layout.generated_classes_dir.clone()),
        ("Bindings source", layout.bindings_source_dir()),
        ("Scripts", layout.script_dir()),
    ];

    println!("{} ({})", layout.project_name, layout.user_project_name());
    for (label, path) in rows {
        println!("  {:<16} {}", label, path.display());
    }

    match &toolchain {
        Some(toolchain) => {
            println!("  {:<16} {}", "Toolchain", toolchain.executable.display());
            if let Some(host) = runtime_host {
                println!("  {:<16} {}", "Runtime host", host.display());
            }
        }
        None => println!("  {:<16} (not located)", "Toolchain"),
    }

    Ok(())
}
