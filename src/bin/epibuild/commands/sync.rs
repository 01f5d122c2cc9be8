//! `epibuild sync` command

use anyhow::Result;

use epibuild::introspect::GnuMakeIntrospector;
use epibuild::ops::sync::{sync_path, sync_workspace, SyncOptions};

use crate::cli::{Cli, SyncArgs};
use crate::commands::load_specs;

pub fn execute(cli: &Cli, args: &SyncArgs) -> Result<()> {
    let specs = load_specs(cli)?;
    specs.check_settings()?;
    let introspector = GnuMakeIntrospector::new()?;

    let patched = match &args.path {
        Some(path) => sync_path(&specs, &introspector, path, args.add_missing, args.dry_run)?,
        None => {
            let options = SyncOptions {
                only: args.only.clone(),
                skip: args.skip.clone(),
                dry_run: args.dry_run,
            };
            sync_workspace(&specs, &introspector, &options)?
        }
    };

    let verb = if args.dry_run { "Would update" } else { "Updated" };
    println!("{verb} {} descriptor(s)", patched.len());
    for path in &patched {
        println!("  {}", path.display());
    }
    Ok(())
}
