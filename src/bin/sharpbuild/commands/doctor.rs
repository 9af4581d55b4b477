//! `sharpbuild doctor` command

use anyhow::Result;

use super::Session;
use crate::GlobalOptions;
use sharpbuild::ops::{doctor, format_report, DoctorOptions};

pub fn execute(opts: &GlobalOptions) -> Result<()> {
    let session = Session::open(opts)?;

    let layout = match session.layout(opts) {
        Ok(layout) => Some(layout),
        Err(e) => {
            tracing::debug!("cannot resolve project roots: {:#}", e);
            None
        }
    };
    let invoker = session.invoker();

    let report = doctor(DoctorOptions {
        settings: &session.config.toolchain,
        layout: layout.as_ref(),
        invoker: &invoker,
    });

    // Print the formatted report
    let output = format_report(&report, opts.shell.is_verbose());
    print!("{}", output);

    // Exit with error code if required checks failed
    if !report.all_required_passed() {
        std::process::exit(1);
    }

    Ok(())
}
