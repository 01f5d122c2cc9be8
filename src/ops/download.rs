//! Downloading declared modules.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::specs::{should_include, Specifications};
use crate::ops::patch;
use crate::sources::{download_module, SourceFetcher};

/// Filters and policy for a workspace download.
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub only: Vec<String>,
    pub skip: Vec<String>,

    /// Reuse occupied target directories instead of failing.
    pub exist_ok: bool,
}

/// Download every declared module to its resolved install path.
///
/// Modules without a git source are skipped with a warning (an explicit
/// `install_path` is assumed to be managed out of band). Declared patches
/// are applied after each module is materialized.
pub fn download_all(
    specs: &Specifications,
    fetcher: &dyn SourceFetcher,
    options: &DownloadOptions,
) -> Result<Vec<PathBuf>> {
    let mut downloaded = Vec::new();

    for module in specs.all_modules() {
        if !should_include(module, &options.only, &options.skip) {
            tracing::debug!("Skipping module `{}` (filtered)", module.name);
            continue;
        }
        if module.git.is_none() {
            tracing::warn!("Module `{}` has no git source; skipping download", module.name);
            continue;
        }

        let target = specs.settings.path_for_module(module);
        let path = download_module(fetcher, module, &target, options.exist_ok)
            .with_context(|| format!("failed to download module `{}`", module.name))?;

        patch::apply_module_patches(module, &specs.settings)?;
        downloaded.push(path);
    }

    Ok(downloaded)
}
