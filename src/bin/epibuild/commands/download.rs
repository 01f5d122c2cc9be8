//! `epibuild download` command

use anyhow::Result;

use epibuild::ops::download::{download_all, DownloadOptions};
use epibuild::sources::GitFetcher;

use crate::cli::{Cli, DownloadArgs};
use crate::commands::load_specs;

pub fn execute(cli: &Cli, args: &DownloadArgs) -> Result<()> {
    let specs = load_specs(cli)?;
    let fetcher = GitFetcher::new()?;

    let options = DownloadOptions {
        only: args.only.clone(),
        skip: args.skip.clone(),
        exist_ok: args.exist_ok,
    };
    let downloaded = download_all(&specs, &fetcher, &options)?;

    println!("Downloaded {} module(s)", downloaded.len());
    for path in &downloaded {
        println!("  {}", path.display());
    }
    Ok(())
}
