//! Specification aggregator.
//!
//! Merges any number of specification files into one workspace: unique base
//! module enforcement, incremental requirement merging, and module/app
//! indexing by variable name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::core::site::Settings;
use crate::core::spec::{Application, Module, Requirements, SpecificationFile};
use crate::core::BASE_MODULE_NAME;
use crate::errors::SpecificationError;
use crate::util::paths;

/// The merged workspace view of all loaded specification files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Specifications {
    /// Path-convention settings, derived from the declared base module.
    pub settings: Settings,

    /// Loaded files, keyed by their on-disk path.
    pub specs: BTreeMap<PathBuf, SpecificationFile>,

    /// All declared modules, in load order.
    pub modules: Vec<Module>,

    /// Declared applications, keyed by the declaring spec file.
    pub applications: BTreeMap<PathBuf, Application>,

    /// Merged system-package requirements.
    pub requirements: Requirements,

    /// The declared base module, if any.
    pub base_spec: Option<Module>,
}

impl Specifications {
    /// Load a workspace from a list of specification files.
    pub fn from_spec_files<P: AsRef<Path>>(spec_paths: &[P]) -> Result<Self> {
        let mut specs = Specifications::default();
        for path in spec_paths {
            specs.add_spec(path.as_ref())?;
        }
        Ok(specs)
    }

    /// Load one specification file and merge it into the workspace.
    pub fn add_spec(&mut self, path: &Path) -> Result<()> {
        let path = paths::expand(path);
        let file = SpecificationFile::from_path(&path)?;
        self.add_spec_file(file, &path)
    }

    /// Merge an already-parsed specification file into the workspace.
    pub fn add_spec_file(&mut self, file: SpecificationFile, origin: &Path) -> Result<()> {
        if let Some(base) = file.modules_by_name().get(BASE_MODULE_NAME) {
            if self.base_spec.is_some() {
                return Err(SpecificationError::BaseDeclaredTwice {
                    path: origin.to_path_buf(),
                }
                .into());
            }
            self.settings.set_base_version(base)?;
            self.base_spec = Some((*base).clone());
        }

        for module in &file.modules {
            self.modules.push(module.clone());
            self.requirements.merge_from(&module.requires);
        }

        if let Some(application) = &file.application {
            self.requirements.merge_from(&application.requires);
            self.applications
                .insert(origin.to_path_buf(), application.clone());
        }

        self.specs.insert(origin.to_path_buf(), file);
        Ok(())
    }

    /// Verify the workspace preconditions for downstream components.
    ///
    /// A base module must be declared and its install path must exist;
    /// both are required before any introspection or download step.
    pub fn check_settings(&self) -> Result<()> {
        if self.base_spec.is_none() {
            return Err(SpecificationError::BaseMissing.into());
        }
        if !self.settings.epics_base.exists() {
            return Err(SpecificationError::BasePathMissing {
                path: self.settings.epics_base.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// All declared modules, in load order.
    pub fn all_modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// Look up a declared module by name or variable name.
    pub fn find_module_by_name(&self, name: &str) -> Result<&Module> {
        self.modules
            .iter()
            .find(|module| module.name == name || module.variable == name)
            .ok_or_else(|| {
                SpecificationError::ModuleNotFound {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Variable name to module; last declaration wins.
    pub fn variable_name_to_module(&self) -> BTreeMap<String, &Module> {
        self.modules
            .iter()
            .map(|module| (module.variable.clone(), module))
            .collect()
    }

    /// Variable name to resolved install path.
    pub fn variable_name_to_path(&self) -> BTreeMap<String, PathBuf> {
        self.modules
            .iter()
            .map(|module| (module.variable.clone(), self.settings.path_for_module(module)))
            .collect()
    }

    /// The final variable bindings for descriptor synchronization.
    pub fn variables_to_sync(&self) -> BTreeMap<String, String> {
        let mut variables = self.settings.variables();
        for (variable, path) in self.variable_name_to_path() {
            variables.insert(variable, path.display().to_string());
        }
        variables
    }
}

/// Whether a module passes the caller's `only`/`skip` filters.
///
/// Both filters match a module's variable name or declared name; `only`
/// restricts to the named set, `skip` excludes it.
pub fn should_include(module: &Module, only: &[String], skip: &[String]) -> bool {
    if !only.is_empty()
        && !only.contains(&module.variable)
        && !only.contains(&module.name)
    {
        return false;
    }
    !(skip.contains(&module.variable) || skip.contains(&module.name))
}
