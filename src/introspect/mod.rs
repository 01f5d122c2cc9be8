//! The Makefile Introspector boundary.
//!
//! The core never parses build-descriptor syntax beyond line-level patching;
//! turning a descriptor into a structured [`Dependency`] record is the job of
//! an [`Introspector`] implementation. The stock implementation spawns GNU
//! make and reads back its variable database.

pub mod gnumake;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::site::Settings;
use crate::core::version::VersionInfo;

pub use gnumake::GnuMakeIntrospector;

/// A structured view of one build descriptor.
///
/// Owned by the dependency graph builder; mutated only by discovery and
/// download steps (newly resolved entries are added, resolved-missing
/// entries removed).
#[derive(Debug, Clone, Default)]
pub struct Dependency {
    /// The descriptor-level variable bound to this module's path.
    ///
    /// Empty for a root application target.
    pub variable_name: String,

    /// Module name, if known.
    pub name: String,

    /// The module's root directory.
    pub path: PathBuf,

    /// Already-satisfied dependencies: variable name to on-disk path.
    pub dependencies: BTreeMap<String, PathBuf>,

    /// Variable bindings pointing at paths that do not exist on disk.
    pub missing_paths: BTreeMap<String, PathBuf>,

    /// Every build-descriptor file referenced by this one, relative to
    /// `path` where possible. Used for synchronization.
    pub makefile_list: Vec<PathBuf>,
}

/// The discovered graph of on-disk modules rooted at one inspection target.
///
/// An append-only arena keyed by filesystem path.
#[derive(Debug, Clone)]
pub struct DependencyGroup {
    /// The inspection root.
    pub root: PathBuf,

    /// All discovered dependency records, keyed by module path.
    modules: BTreeMap<PathBuf, Dependency>,
}

impl DependencyGroup {
    /// Create an empty group rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DependencyGroup {
            root: root.into(),
            modules: BTreeMap::new(),
        }
    }

    /// Add a dependency record, keyed by its path.
    ///
    /// Existing records are never silently replaced; re-inserting a known
    /// path keeps the first record and returns false.
    pub fn insert(&mut self, dependency: Dependency) -> bool {
        match self.modules.entry(dependency.path.clone()) {
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(dependency);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, path: &Path) -> Option<&Dependency> {
        self.modules.get(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Dependency> {
        self.modules.get_mut(path)
    }

    /// The record for the inspection root.
    pub fn root_dependency(&self) -> Option<&Dependency> {
        self.modules.get(&self.root)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &Dependency)> {
        self.modules.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.modules.keys()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Variable name to dependency record, for planning.
    pub fn variable_to_dependency(&self) -> BTreeMap<String, &Dependency> {
        self.modules
            .values()
            .filter(|dependency| !dependency.variable_name.is_empty())
            .map(|dependency| (dependency.variable_name.clone(), dependency))
            .collect()
    }
}

/// A dependency referenced by a descriptor but absent on disk.
#[derive(Debug, Clone)]
pub struct MissingDependency {
    /// The variable bound to the missing path.
    pub variable: String,

    /// The path the descriptor expects.
    pub path: PathBuf,

    /// Identity inferred from path conventions; `None` when the path
    /// matches no convention (surfaced to the caller, not dropped).
    pub version: Option<VersionInfo>,
}

/// Turns a build descriptor into a structured dependency record.
pub trait Introspector {
    /// Introspect the build descriptor for the module at `path`.
    ///
    /// `variables` are the bindings made visible to the descriptor's build
    /// system during evaluation (at minimum the base module's variable).
    fn introspect(
        &self,
        path: &Path,
        name: &str,
        variable_name: &str,
        settings: &Settings,
        variables: &BTreeMap<String, String>,
    ) -> Result<Dependency>;
}

/// Find all missing dependencies of one record using path conventions.
///
/// Identity-inference misses yield records with `version: None`; callers
/// decide whether to surface them for manual specification.
pub fn find_missing_dependencies(
    dependency: &Dependency,
    settings: &Settings,
) -> Vec<MissingDependency> {
    let mut found = Vec::new();
    for (variable, path) in &dependency.missing_paths {
        tracing::debug!("Checking missing path: {}={}", variable, path.display());
        let version = VersionInfo::from_path(path, settings);
        if version.is_none() {
            tracing::debug!(
                "Dependency path for {}={} does not match known patterns",
                variable,
                path.display()
            );
        }
        found.push(MissingDependency {
            variable: variable.clone(),
            path: path.clone(),
            version,
        });
    }
    found
}

/// Variable names that never denote a module dependency.
pub(crate) fn is_reserved_variable(name: &str) -> bool {
    const RESERVED: &[&str] = &["TOP", "MAKEFILE_LIST", "CURDIR", "INSTALL_LOCATION"];
    RESERVED.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spec::{GitSource, Module};
    use crate::core::BASE_MODULE_NAME;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        let mut base = Module::new(BASE_MODULE_NAME);
        base.git = Some(GitSource::new(
            "https://github.com/slac-epics/epics-base",
            "R7.0.2-2.0",
        ));
        settings.set_base_version(&base).unwrap();
        settings
    }

    #[test]
    fn test_group_is_append_only() {
        let mut group = DependencyGroup::new("/ioc");

        let first = Dependency {
            variable_name: "ASYN".into(),
            path: PathBuf::from("/modules/asyn"),
            ..Default::default()
        };
        let replacement = Dependency {
            variable_name: "OTHER".into(),
            path: PathBuf::from("/modules/asyn"),
            ..Default::default()
        };

        assert!(group.insert(first));
        assert!(!group.insert(replacement));
        assert_eq!(
            group.get(Path::new("/modules/asyn")).unwrap().variable_name,
            "ASYN"
        );
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_find_missing_surfaces_unmatched_paths() {
        let settings = settings();
        let mut dependency = Dependency::default();
        dependency.missing_paths.insert(
            "ASYN".into(),
            PathBuf::from("/cds/group/pcds/epics/R7.0.2-2.0/modules/asyn/R4.39-1.0.1"),
        );
        dependency
            .missing_paths
            .insert("MYSTERY".into(), PathBuf::from("/opt/strange/place"));

        let missing = find_missing_dependencies(&dependency, &settings);
        assert_eq!(missing.len(), 2);

        let asyn = missing.iter().find(|m| m.variable == "ASYN").unwrap();
        assert_eq!(asyn.version.as_ref().unwrap().name, "asyn");

        let mystery = missing.iter().find(|m| m.variable == "MYSTERY").unwrap();
        assert!(mystery.version.is_none());
    }
}
