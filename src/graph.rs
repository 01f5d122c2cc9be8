//! Recursive dependency discovery and download.
//!
//! [`RecursiveInspector`] drives introspection to a fixed point: inspect a
//! root target, walk every on-disk dependency it names, download the ones
//! that are absent, and repeat until no new module appears. Paths that match
//! no site convention are surfaced as unresolved rather than dropped.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::spec::Module;
use crate::core::specs::Specifications;
use crate::core::version::VersionInfo;
use crate::errors::DownloadError;
use crate::introspect::{
    find_missing_dependencies, Dependency, DependencyGroup, Introspector, MissingDependency,
};
use crate::sources::{download_module, SourceFetcher};
use crate::sync;
use crate::util::paths;

struct PendingDependency {
    name: String,
    variable: String,
    path: PathBuf,
}

/// Walks a dependency tree, inspecting and (optionally) downloading modules.
pub struct RecursiveInspector<'a> {
    specs: &'a Specifications,
    introspector: &'a dyn Introspector,
    group: DependencyGroup,
    variable_to_version: BTreeMap<String, VersionInfo>,
    pending: VecDeque<PendingDependency>,
    visited: BTreeSet<PathBuf>,
    sync_descriptors: bool,
}

impl<'a> RecursiveInspector<'a> {
    /// Inspect an application tree rooted at `path`.
    pub fn from_path(
        path: impl AsRef<Path>,
        specs: &'a Specifications,
        introspector: &'a dyn Introspector,
    ) -> Result<Self> {
        let root = paths::expand(path.as_ref());
        let mut inspector = RecursiveInspector::empty(&root, specs, introspector);
        inspector.add_dependency("", "", &root)?;
        Ok(inspector)
    }

    /// Inspect a declared module at its resolved install path.
    pub fn from_module(
        module: &Module,
        specs: &'a Specifications,
        introspector: &'a dyn Introspector,
    ) -> Result<Self> {
        let root = specs.settings.path_for_module(module);
        let mut inspector = RecursiveInspector::empty(&root, specs, introspector);
        inspector.add_dependency(&module.name, &module.variable, &root)?;
        Ok(inspector)
    }

    fn empty(root: &Path, specs: &'a Specifications, introspector: &'a dyn Introspector) -> Self {
        RecursiveInspector {
            specs,
            introspector,
            group: DependencyGroup::new(root),
            variable_to_version: BTreeMap::new(),
            pending: VecDeque::new(),
            visited: BTreeSet::new(),
            sync_descriptors: true,
        }
    }

    /// Leave build descriptors untouched during discovery.
    ///
    /// By default every inspected module's descriptors are synchronized to
    /// the workspace bindings before use; read-only inspection turns that
    /// off.
    pub fn without_sync(mut self) -> Self {
        self.sync_descriptors = false;
        self
    }

    /// The discovered dependency group.
    pub fn group(&self) -> &DependencyGroup {
        &self.group
    }

    pub fn into_group(self) -> DependencyGroup {
        self.group
    }

    /// Variable name to inferred version, for everything discovered so far.
    pub fn variable_to_version(&self) -> &BTreeMap<String, VersionInfo> {
        &self.variable_to_version
    }

    /// Walk every on-disk dependency reachable from the root.
    ///
    /// Terminates on cycles: each path is inspected at most once. Inspection
    /// failures of non-root modules are logged and skipped so one broken
    /// tree does not hide the rest.
    pub fn discover(&mut self) -> Result<()> {
        while let Some(pending) = self.pending.pop_front() {
            if let Err(error) =
                self.add_dependency(&pending.name, &pending.variable, &pending.path)
            {
                tracing::warn!(
                    "Failed to inspect dependency {} at {}: {:#}",
                    pending.variable,
                    pending.path.display(),
                    error
                );
            }
        }
        Ok(())
    }

    /// Inspect one module and queue its on-disk dependencies.
    ///
    /// Already-visited paths are skipped, which doubles as the cycle guard.
    fn add_dependency(&mut self, name: &str, variable_name: &str, path: &Path) -> Result<bool> {
        let path = paths::expand(path);
        if !self.visited.insert(path.clone()) {
            return Ok(false);
        }

        let variables = self.specs.variables_to_sync();
        let mut dependency = self
            .introspector
            .introspect(&path, name, variable_name, &self.specs.settings, &variables)
            .with_context(|| format!("failed to inspect {}", path.display()))?;

        if self.sync_descriptors {
            let patched =
                sync::update_related_makefiles(&path, &dependency.makefile_list, &variables, false);
            if !patched.is_empty() {
                tracing::info!(
                    "Synchronized {} descriptor(s) under {}; re-inspecting",
                    patched.len(),
                    path.display()
                );
                dependency = self.introspector.introspect(
                    &path,
                    name,
                    variable_name,
                    &self.specs.settings,
                    &variables,
                )?;
            }
        }

        self.record_versions(&dependency);
        self.queue_children(&dependency);
        self.group.insert(dependency);
        Ok(true)
    }

    fn record_versions(&mut self, dependency: &Dependency) {
        if !dependency.variable_name.is_empty() {
            if let Some(version) = VersionInfo::from_path(&dependency.path, &self.specs.settings)
            {
                self.variable_to_version
                    .insert(dependency.variable_name.clone(), version);
            }
        }
        for (variable, path) in &dependency.dependencies {
            if let Some(version) = VersionInfo::from_path(path, &self.specs.settings) {
                self.variable_to_version.insert(variable.clone(), version);
            }
        }
    }

    fn queue_children(&mut self, dependency: &Dependency) {
        for (variable, path) in &dependency.dependencies {
            let path = paths::expand(path);
            if self.visited.contains(&path) {
                continue;
            }
            let name = VersionInfo::from_path(&path, &self.specs.settings)
                .map(|version| version.name)
                .unwrap_or_else(|| variable.to_lowercase());
            self.pending.push_back(PendingDependency {
                name,
                variable: variable.clone(),
                path,
            });
        }
    }

    /// Download absent dependencies until the tree reaches a fixed point.
    ///
    /// Returns the dependencies that remain unresolved because their paths
    /// match no site convention; those need explicit specification entries.
    pub fn download_missing_dependencies(
        &mut self,
        fetcher: &dyn SourceFetcher,
    ) -> Result<Vec<MissingDependency>> {
        loop {
            self.discover()?;

            let mut progress = false;
            let module_paths: Vec<PathBuf> = self.group.paths().cloned().collect();
            for module_path in module_paths {
                let missing = match self.group.get(&module_path) {
                    Some(record) => find_missing_dependencies(record, &self.specs.settings),
                    None => continue,
                };

                for item in missing {
                    let Some(version) = &item.version else {
                        continue;
                    };
                    let target = self.resolve_missing(
                        fetcher,
                        &module_path,
                        &item.variable,
                        &item.path,
                        version,
                    )?;

                    if let Some(record) = self.group.get_mut(&module_path) {
                        record.missing_paths.remove(&item.variable);
                        record
                            .dependencies
                            .insert(item.variable.clone(), target.clone());
                    }
                    self.variable_to_version
                        .insert(item.variable.clone(), version.clone());
                    self.pending.push_back(PendingDependency {
                        name: version.name.clone(),
                        variable: item.variable.clone(),
                        path: target,
                    });
                    progress = true;
                }
            }

            if !progress {
                break;
            }
        }

        Ok(self.unresolved())
    }

    /// Materialize one missing dependency, reusing an occupied target.
    fn resolve_missing(
        &self,
        fetcher: &dyn SourceFetcher,
        dependent: &Path,
        variable: &str,
        path: &Path,
        version: &VersionInfo,
    ) -> Result<PathBuf> {
        // A declared module wins over the identity inferred from the path;
        // it may carry the real URL and clone options.
        let module = match self.specs.find_module_by_name(variable) {
            Ok(declared) => declared.clone(),
            Err(_) => version.to_module(variable, &self.specs.settings),
        };

        tracing::info!(
            "{} needs {}={} ({} {})",
            dependent.display(),
            variable,
            path.display(),
            version.name,
            version.tag
        );

        match download_module(fetcher, &module, path, false) {
            Ok(target) => Ok(target),
            Err(error) => match error.downcast_ref::<DownloadError>() {
                Some(download_error @ DownloadError::TargetExists { .. }) => {
                    let existing = download_error
                        .existing_path()
                        .cloned()
                        .unwrap_or_else(|| paths::expand(path));
                    tracing::info!("Reusing existing module at {}", existing.display());
                    Ok(existing)
                }
                _ => Err(error),
            },
        }
    }

    /// Every still-missing dependency with no inferable identity.
    pub fn unresolved(&self) -> Vec<MissingDependency> {
        let mut unresolved = Vec::new();
        for (_, record) in self.group.iter() {
            for item in find_missing_dependencies(record, &self.specs.settings) {
                if item.version.is_none() {
                    unresolved.push(item);
                }
            }
        }
        unresolved
    }
}

/// Inspect a declared module's on-disk dependency tree without downloading.
pub fn dependency_group_for_module(
    module: &Module,
    specs: &Specifications,
    introspector: &dyn Introspector,
) -> Result<DependencyGroup> {
    let mut inspector =
        RecursiveInspector::from_module(module, specs, introspector)?.without_sync();
    inspector.discover()?;
    Ok(inspector.into_group())
}
