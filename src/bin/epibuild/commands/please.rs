//! `epibuild please` command
//!
//! The everything command: download the declared modules, pull in whatever
//! else the application's descriptors reference, synchronize, and build.

use std::time::Duration;

use anyhow::{bail, Result};

use epibuild::graph::RecursiveInspector;
use epibuild::introspect::GnuMakeIntrospector;
use epibuild::ops::build::{build_all, build_application, BuildOptions};
use epibuild::ops::download::{download_all, DownloadOptions};
use epibuild::sources::GitFetcher;

use crate::cli::{Cli, PleaseArgs};
use crate::commands::load_specs;

pub fn execute(cli: &Cli, args: &PleaseArgs) -> Result<()> {
    let specs = load_specs(cli)?;
    let fetcher = GitFetcher::new()?;
    let introspector = GnuMakeIntrospector::new()?;

    let download_options = DownloadOptions {
        exist_ok: true,
        ..Default::default()
    };
    download_all(&specs, &fetcher, &download_options)?;
    specs.check_settings()?;

    let mut inspector = RecursiveInspector::from_path(&args.path, &specs, &introspector)?;
    let unresolved = inspector.download_missing_dependencies(&fetcher)?;
    for item in &unresolved {
        tracing::error!(
            "Cannot resolve {}={}; add it to a specification file",
            item.variable,
            item.path.display()
        );
    }
    if !unresolved.is_empty() {
        bail!("{} dependency path(s) could not be resolved", unresolved.len());
    }

    let build_options = BuildOptions {
        stop_on_failure: args.stop_on_failure,
        timeout: args.timeout.map(Duration::from_secs),
        ..Default::default()
    };
    let report = build_all(&specs, &introspector, &build_options)?;
    if !report.success() {
        bail!("{} module(s) failed to build", report.failed().count());
    }

    for application in specs.applications.values() {
        let result = build_application(&specs, application, &args.path, &build_options)?;
        if !result.success {
            bail!("application build failed in {}", args.path.display());
        }
    }
    if specs.applications.is_empty() {
        let result = build_application(
            &specs,
            &Default::default(),
            &args.path,
            &build_options,
        )?;
        if !result.success {
            bail!("application build failed in {}", args.path.display());
        }
    }

    println!("All done: {} module(s) built", report.results.len());
    Ok(())
}
