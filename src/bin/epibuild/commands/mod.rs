//! Command implementations

pub mod build;
pub mod completions;
pub mod download;
pub mod inspect;
pub mod parse;
pub mod patch;
pub mod please;
pub mod release_site;
pub mod requirements;
pub mod sync;

use anyhow::{bail, Result};

use epibuild::core::site::SiteConfig;
use epibuild::Specifications;

use crate::cli::Cli;

/// Load the workspace from the global `--spec`/`--site` options.
pub(crate) fn load_specs(cli: &Cli) -> Result<Specifications> {
    if cli.spec.is_empty() {
        bail!("no specification files provided (use --spec or EPIBUILD_SPECS)");
    }

    let mut specs = Specifications::default();
    if let Some(site) = &cli.site {
        specs.settings.site = SiteConfig::from_file(site)?;
    }
    for path in &cli.spec {
        specs.add_spec(path)?;
    }
    Ok(specs)
}
