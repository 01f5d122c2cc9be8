//! Read-only inspection of a dependency tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::builder::plan::build_order;
use crate::core::spec::{Application, SpecificationFile};
use crate::core::specs::Specifications;
use crate::core::version::VersionInfo;
use crate::core::BASE_VARIABLE;
use crate::graph::RecursiveInspector;
use crate::introspect::{Dependency, Introspector};

/// One inspected module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub variable: String,
    pub name: String,
    pub path: PathBuf,
    pub dependencies: BTreeMap<String, PathBuf>,
    pub missing: BTreeMap<String, PathBuf>,
}

/// A referenced dependency that is absent on disk.
#[derive(Debug, Clone, Serialize)]
pub struct MissingReport {
    pub variable: String,
    pub path: PathBuf,

    /// Identity inferred from the path conventions, when any matched.
    pub version: Option<VersionInfo>,
}

/// The full inspection result for one application or module tree.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub root: PathBuf,
    pub modules: Vec<ModuleReport>,
    pub missing: Vec<MissingReport>,
    pub build_order: Vec<String>,
}

impl InspectReport {
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Inspect a tree without downloading or modifying anything.
pub fn inspect_path(
    specs: &Specifications,
    introspector: &dyn Introspector,
    path: &Path,
) -> Result<InspectReport> {
    let mut inspector =
        RecursiveInspector::from_path(path, specs, introspector)?.without_sync();
    inspector.discover()?;

    let mut modules = Vec::new();
    let mut missing = Vec::new();
    let mut graph: BTreeMap<String, Dependency> = BTreeMap::new();

    for (module_path, record) in inspector.group().iter() {
        modules.push(ModuleReport {
            variable: record.variable_name.clone(),
            name: record.name.clone(),
            path: module_path.clone(),
            dependencies: record.dependencies.clone(),
            missing: record.missing_paths.clone(),
        });
        if !record.variable_name.is_empty() {
            graph.insert(record.variable_name.clone(), record.clone());
        }

        for item in crate::introspect::find_missing_dependencies(record, &specs.settings) {
            missing.push(MissingReport {
                variable: item.variable,
                path: item.path,
                version: item.version,
            });
        }
    }

    Ok(InspectReport {
        root: inspector.group().root.clone(),
        modules,
        missing,
        build_order: build_order(&graph, &[BASE_VARIABLE.to_string()], &[]),
    })
}

/// Turn an inspection into a starting-point specification.
///
/// Missing dependencies whose identity could be inferred become module
/// declarations to pin down; modules already on disk become the
/// application's standard module list.
pub fn starter_spec(report: &InspectReport, specs: &Specifications) -> SpecificationFile {
    let mut modules = Vec::new();
    let mut seen: std::collections::BTreeSet<&str> = std::collections::BTreeSet::new();
    for item in &report.missing {
        if let Some(version) = &item.version {
            if seen.insert(&item.variable) {
                modules.push(version.to_module(&item.variable, &specs.settings));
            }
        }
    }

    let standard_modules = report
        .modules
        .iter()
        .filter(|module| !module.variable.is_empty())
        .map(|module| module.variable.clone())
        .collect();

    SpecificationFile {
        modules,
        application: Some(Application {
            standard_modules,
            ..Default::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::Dependency;
    use crate::test_support::{workspace_under, FakeIntrospector};

    #[test]
    fn test_inspect_reports_modules_and_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let specs = workspace_under(tmp.path());
        let root = tmp.path().join("ioc");
        let asyn = specs.settings.support.join("asyn/R4.39");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&asyn).unwrap();

        let sequencer = specs.settings.support.join("sequencer/R2.2.6");

        let mut introspector = FakeIntrospector::default();
        introspector.insert(
            &root,
            Dependency {
                dependencies: BTreeMap::from([("ASYN".to_string(), asyn.clone())]),
                missing_paths: BTreeMap::from([("SNCSEQ".to_string(), sequencer.clone())]),
                ..Default::default()
            },
        );
        introspector.insert(&asyn, Dependency::default());

        let report = inspect_path(&specs, &introspector, &root).unwrap();

        assert_eq!(report.modules.len(), 2);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].variable, "SNCSEQ");
        assert_eq!(
            report.missing[0].version.as_ref().unwrap().name,
            "sequencer"
        );
        // The root has no variable name and stays out of the build order.
        assert_eq!(report.build_order, vec!["ASYN"]);

        let yaml = report.to_yaml().unwrap();
        assert!(yaml.contains("SNCSEQ"));
    }

    #[test]
    fn test_starter_spec_lists_discovered_and_missing_modules() {
        let tmp = tempfile::TempDir::new().unwrap();
        let specs = workspace_under(tmp.path());
        let root = tmp.path().join("ioc");
        let asyn = specs.settings.support.join("asyn/R4.39");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&asyn).unwrap();

        let sequencer = specs.settings.support.join("sequencer/R2.2.6");

        let mut introspector = FakeIntrospector::default();
        introspector.insert(
            &root,
            Dependency {
                dependencies: BTreeMap::from([("ASYN".to_string(), asyn.clone())]),
                missing_paths: BTreeMap::from([("SNCSEQ".to_string(), sequencer)]),
                ..Default::default()
            },
        );
        introspector.insert(&asyn, Dependency::default());

        let report = inspect_path(&specs, &introspector, &root).unwrap();
        let spec = starter_spec(&report, &specs);

        // Modules on disk become the application's standard list; the
        // inferable missing one becomes a declaration to pin down.
        let application = spec.application.unwrap();
        assert_eq!(application.standard_modules, vec!["ASYN"]);
        assert_eq!(spec.modules.len(), 1);
        assert_eq!(spec.modules[0].name, "sequencer");
        assert_eq!(spec.modules[0].variable, "SNCSEQ");
        assert_eq!(spec.modules[0].git.as_ref().unwrap().tag, "R2.2.6");
    }
}
