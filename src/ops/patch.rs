//! Post-download patching of module trees.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::core::site::Settings;
use crate::core::spec::{Module, Patch, PatchMethod};
use crate::core::specs::{should_include, Specifications};

/// Apply one patch inside a module's install tree.
fn apply_patch(patch: &Patch, install_path: &Path) -> Result<()> {
    let dest = install_path.join(&patch.dest_file);
    if !patch.description.is_empty() {
        tracing::info!("Patching {}: {}", dest.display(), patch.description);
    } else {
        tracing::info!("Patching {}", dest.display());
    }

    match patch.method {
        PatchMethod::Replace => {
            let Some(contents) = &patch.contents else {
                bail!(
                    "patch for {} uses `replace` but has no contents",
                    patch.dest_file.display()
                );
            };
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&dest, contents)
                .with_context(|| format!("failed to write {}", dest.display()))?;
        }
    }

    #[cfg(unix)]
    if let Some(mode) = patch.mode {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&dest, std::fs::Permissions::from_mode(mode))
            .with_context(|| format!("failed to set mode on {}", dest.display()))?;
    }

    Ok(())
}

/// Apply all of a module's declared patches; returns the number applied.
pub fn apply_module_patches(module: &Module, settings: &Settings) -> Result<usize> {
    let install_path = settings.path_for_module(module);
    if !module.patches.is_empty() && !install_path.exists() {
        bail!(
            "cannot patch `{}`: install path {} does not exist",
            module.name,
            install_path.display()
        );
    }
    for patch in &module.patches {
        apply_patch(patch, &install_path)
            .with_context(|| format!("failed to patch module `{}`", module.name))?;
    }
    Ok(module.patches.len())
}

/// Apply patches for every declared module passing the filters.
pub fn apply_all(specs: &Specifications, only: &[String], skip: &[String]) -> Result<usize> {
    let mut applied = 0;
    for module in specs.all_modules() {
        if !should_include(module, only, skip) {
            continue;
        }
        applied += apply_module_patches(module, &specs.settings)?;
    }
    Ok(applied)
}
