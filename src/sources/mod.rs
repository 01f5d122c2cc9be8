//! Module source acquisition.

pub mod git;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::spec::Module;
use crate::errors::DownloadError;
use crate::util::paths;

pub use git::GitFetcher;

/// Materializes a module's pinned revision into a target directory.
pub trait SourceFetcher {
    /// Fetch `module`'s source into `target`.
    ///
    /// The target directory must not exist; atomicity of partial fetches is
    /// the implementation's concern.
    fn fetch(&self, module: &Module, target: &Path) -> Result<()>;
}

/// Download one module to its resolved install path.
///
/// With `exist_ok`, a non-empty target directory is trusted as a prior
/// download and returned as-is. Without it, an occupied target is a
/// [`DownloadError::TargetExists`] the caller can branch on.
pub fn download_module(
    fetcher: &dyn SourceFetcher,
    module: &Module,
    target: &Path,
    exist_ok: bool,
) -> Result<PathBuf> {
    let target = paths::expand(target);

    if target.is_file() {
        return Err(DownloadError::TargetNotADirectory { path: target }.into());
    }
    if paths::is_nonempty_dir(&target) {
        if exist_ok {
            tracing::info!(
                "Module `{}` already present at {}",
                module.name,
                target.display()
            );
            return Ok(target);
        }
        return Err(DownloadError::TargetExists { path: target }.into());
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!("Downloading `{}` to {}", module.name, target.display());
    fetcher.fetch(module, &target)?;
    Ok(target)
}
