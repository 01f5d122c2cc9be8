//! `epibuild inspect` command

use anyhow::Result;

use epibuild::introspect::GnuMakeIntrospector;
use epibuild::ops::inspect::{inspect_path, starter_spec};

use crate::cli::{Cli, InspectArgs};
use crate::commands::load_specs;

pub fn execute(cli: &Cli, args: &InspectArgs) -> Result<()> {
    let specs = load_specs(cli)?;
    specs.check_settings()?;
    let introspector = GnuMakeIntrospector::new()?;

    let report = inspect_path(&specs, &introspector, &args.path)?;

    let rendered = if args.emit_spec {
        starter_spec(&report, &specs).to_yaml()?
    } else if args.json {
        report.to_json()?
    } else {
        report.to_yaml()?
    };
    println!("{rendered}");

    if !report.missing.is_empty() {
        eprintln!("{} dependency path(s) are missing on disk", report.missing.len());
    }
    Ok(())
}
