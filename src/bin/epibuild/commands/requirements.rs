//! `epibuild requirements` command

use anyhow::{bail, Result};

use epibuild::ops::requirements::install_commands;
use epibuild::syspkg::PackageManager;

use crate::cli::{Cli, RequirementsArgs};
use crate::commands::load_specs;

pub fn execute(cli: &Cli, args: &RequirementsArgs) -> Result<()> {
    let specs = load_specs(cli)?;

    let manager = if args.detect {
        match PackageManager::guess() {
            Some(manager) => Some(manager),
            None => bail!("no supported package manager found on this host"),
        }
    } else {
        args.manager
            .as_deref()
            .map(str::parse::<PackageManager>)
            .transpose()?
    };

    let commands = install_commands(&specs, manager);
    if commands.is_empty() {
        println!("No system-package requirements declared");
    }
    for command in commands {
        println!("{command}");
    }
    Ok(())
}
