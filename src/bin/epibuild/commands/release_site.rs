//! `epibuild release-site` command

use anyhow::Result;

use epibuild::errors::SpecificationError;
use epibuild::ops::release_site::write_release_site;

use crate::cli::{Cli, ReleaseSiteArgs};
use crate::commands::load_specs;

pub fn execute(cli: &Cli, args: &ReleaseSiteArgs) -> Result<()> {
    let specs = load_specs(cli)?;
    // The file can be written before the base is installed, but its
    // contents need a declared base version.
    if specs.base_spec.is_none() {
        return Err(SpecificationError::BaseMissing.into());
    }

    let target = write_release_site(&specs.settings, &args.path)?;
    println!("Wrote {}", target.display());
    Ok(())
}
