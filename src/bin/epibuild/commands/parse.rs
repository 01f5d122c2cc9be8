//! `epibuild parse` command

use anyhow::Result;

use crate::cli::{Cli, ParseArgs};
use crate::commands::load_specs;

pub fn execute(cli: &Cli, args: &ParseArgs) -> Result<()> {
    let specs = load_specs(cli)?;

    let rendered = if args.json {
        serde_json::to_string_pretty(&specs)?
    } else {
        serde_yaml::to_string(&specs)?
    };
    println!("{rendered}");

    Ok(())
}
