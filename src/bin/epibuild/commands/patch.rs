//! `epibuild patch` command

use anyhow::Result;

use epibuild::ops::patch::apply_all;

use crate::cli::{Cli, PatchArgs};
use crate::commands::load_specs;

pub fn execute(cli: &Cli, args: &PatchArgs) -> Result<()> {
    let specs = load_specs(cli)?;

    let applied = apply_all(&specs, &args.only, &args.skip)?;
    println!("Applied {applied} patch(es)");
    Ok(())
}
