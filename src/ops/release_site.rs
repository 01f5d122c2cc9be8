//! RELEASE_SITE generation.
//!
//! EPICS application trees read site-wide locations from a `RELEASE_SITE`
//! file; this renders one from the workspace settings so applications agree
//! with the paths epibuild resolves.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::site::Settings;

/// Render the RELEASE_SITE contents for the workspace.
pub fn render(settings: &Settings) -> String {
    format!(
        "#--- Generated by epibuild; do not edit by hand.\n\
         BASE_MODULE_VERSION={base_version}\n\
         EPICS_SITE_TOP={site_top}\n\
         BASE_SITE_TOP={site_top}/base\n\
         EPICS_MODULES={modules}\n\
         EPICS_BASE={base}\n",
        base_version = settings.base_tag(),
        site_top = settings.site.epics_site_top.display(),
        modules = settings.support.display(),
        base = settings.epics_base.display(),
    )
}

/// Write RELEASE_SITE for an application tree.
///
/// `path` may be the application root (the file goes into its `configure/`
/// directory when one exists, next to the Makefile otherwise) or the target
/// file itself.
pub fn write_release_site(settings: &Settings, path: &Path) -> Result<PathBuf> {
    let target = if path.is_dir() {
        let configure = path.join("configure");
        if configure.is_dir() {
            configure.join("RELEASE_SITE")
        } else {
            path.join("RELEASE_SITE")
        }
    } else {
        path.to_path_buf()
    };

    std::fs::write(&target, render(settings))
        .with_context(|| format!("failed to write {}", target.display()))?;
    tracing::info!("Wrote {}", target.display());
    Ok(target)
}
