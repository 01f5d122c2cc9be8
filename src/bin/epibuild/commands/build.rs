//! `epibuild build` command

use std::time::Duration;

use anyhow::{bail, Result};

use epibuild::introspect::GnuMakeIntrospector;
use epibuild::ops::build::{build_all, build_application, BuildOptions};

use crate::cli::{Cli, BuildArgs};
use crate::commands::load_specs;

pub fn execute(cli: &Cli, args: &BuildArgs) -> Result<()> {
    let specs = load_specs(cli)?;
    specs.check_settings()?;
    let introspector = GnuMakeIntrospector::new()?;

    let options = BuildOptions {
        only: args.only.clone(),
        skip: args.skip.clone(),
        stop_on_failure: args.stop_on_failure,
        clean: args.clean,
        timeout: args.timeout.map(Duration::from_secs),
    };
    let report = build_all(&specs, &introspector, &options)?;

    for result in &report.results {
        let status = if result.success { "ok" } else { "FAILED" };
        println!(
            "{:<20} {:>8.1}s  {}",
            result.variable,
            result.elapsed().num_milliseconds() as f64 / 1000.0,
            status
        );
    }

    if let Some(path) = &args.path {
        for application in specs.applications.values() {
            let result = build_application(&specs, application, path, &options)?;
            let status = if result.success { "ok" } else { "FAILED" };
            println!("{:<20} application  {}", result.variable, status);
            if !result.success {
                bail!("application build failed in {}", path.display());
            }
        }
    }

    let failed = report.failed().count();
    if failed > 0 {
        bail!("{failed} module(s) failed to build");
    }
    Ok(())
}
