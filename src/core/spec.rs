//! Specification file parsing and schema.
//!
//! A specification file is the unit of declaration: a YAML document listing
//! desired modules and/or one application. Multiple files compose into one
//! workspace via [`crate::core::specs::Specifications`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Options forwarded to the native build tool for one module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MakeOptions {
    /// Extra arguments appended to the make invocation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Parallelism degree (`make -jN`); opaque to epibuild itself.
    #[serde(default = "default_parallel")]
    pub parallel: usize,
}

impl Default for MakeOptions {
    fn default() -> Self {
        MakeOptions {
            args: Vec::new(),
            parallel: default_parallel(),
        }
    }
}

fn default_parallel() -> usize {
    1
}

/// A pinned, shallow-clonable git revision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitSource {
    /// Remote repository URL.
    pub url: String,

    /// Branch or tag to clone.
    pub tag: String,

    /// Extra whitespace-separated arguments for the clone invocation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub args: String,

    /// Shallow clone depth.
    #[serde(default = "default_depth")]
    pub depth: u32,

    /// Clone submodules recursively.
    #[serde(default = "default_true")]
    pub recursive: bool,
}

impl GitSource {
    /// Create a source with default clone settings.
    pub fn new(url: impl Into<String>, tag: impl Into<String>) -> Self {
        GitSource {
            url: url.into(),
            tag: tag.into(),
            args: String::new(),
            depth: default_depth(),
            recursive: default_true(),
        }
    }
}

fn default_depth() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

/// System-package requirements, keyed by package manager.
///
/// Three independent lists; merging is a per-list set-union that preserves
/// first-seen order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requirements {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub yum: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apt: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conda: Vec<String>,
}

impl Requirements {
    /// Merge `other` into `self`, skipping entries already present.
    pub fn merge_from(&mut self, other: &Requirements) {
        merge_list(&mut self.yum, &other.yum);
        merge_list(&mut self.apt, &other.apt);
        merge_list(&mut self.conda, &other.conda);
    }

    pub fn is_empty(&self) -> bool {
        self.yum.is_empty() && self.apt.is_empty() && self.conda.is_empty()
    }
}

fn merge_list(into: &mut Vec<String>, from: &[String]) {
    for entry in from {
        if !into.contains(entry) {
            into.push(entry.clone());
        }
    }
}

/// How a [`Patch`] is applied.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatchMethod {
    /// Replace the destination file wholesale with `contents`.
    #[default]
    Replace,
}

/// A file-level patch applied to a module's install tree after download.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patch {
    /// Human-readable reason for the patch.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Destination file, relative to the module's install path.
    pub dest_file: PathBuf,

    #[serde(default)]
    pub method: PatchMethod,

    /// Replacement contents for `method = replace`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,

    /// File mode to apply after writing (e.g. `0o755`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
}

/// A named, independently buildable unit with a pinned source revision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Module {
    /// Module name (also the repository name by convention).
    pub name: String,

    /// Build-descriptor variable bound to this module's install path.
    ///
    /// Derived from `name` (upper-snake) when not declared; non-empty after
    /// construction.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub variable: String,

    /// Explicit install path override; takes precedence over conventions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_path: Option<PathBuf>,

    /// Where to obtain the module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSource>,

    #[serde(default, skip_serializing_if = "is_default_make")]
    pub make: MakeOptions,

    #[serde(default, skip_serializing_if = "Requirements::is_empty")]
    pub requires: Requirements,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<Patch>,
}

fn is_default_make(make: &MakeOptions) -> bool {
    *make == MakeOptions::default()
}

impl Module {
    /// Create a module with the variable name derived from `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let variable = default_variable_for(&name);
        Module {
            name,
            variable,
            install_path: None,
            git: None,
            make: MakeOptions::default(),
            requires: Requirements::default(),
            patches: Vec::new(),
        }
    }

    /// Fill in derived fields after deserialization.
    pub fn apply_defaults(&mut self) {
        if self.variable.is_empty() {
            self.variable = default_variable_for(&self.name);
        }
    }

    /// The declared version tag.
    pub fn version(&self) -> Result<&str> {
        match &self.git {
            Some(git) => Ok(&git.tag),
            None => bail!("module `{}` has no git source and thus no version", self.name),
        }
    }
}

/// Derive the build-descriptor variable name for a module name.
pub fn default_variable_for(name: &str) -> String {
    name.replace('-', "_").to_uppercase()
}

/// A buildable target that is not itself a reusable module.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Application {
    /// Name of the produced binary, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,

    /// Names of already-declared modules this application uses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub standard_modules: Vec<String>,

    #[serde(default, skip_serializing_if = "Requirements::is_empty")]
    pub requires: Requirements,

    #[serde(default, skip_serializing_if = "is_default_make")]
    pub make: MakeOptions,
}

/// One declarative specification file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpecificationFile {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<Module>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<Application>,
}

impl SpecificationFile {
    /// Load and validate a specification file from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read specification file {}", path.display()))?;
        Self::from_str(&contents)
            .with_context(|| format!("failed to parse specification file {}", path.display()))
    }

    /// Parse a specification file from YAML text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self> {
        let mut file: SpecificationFile = serde_yaml::from_str(contents)?;
        for module in &mut file.modules {
            module.apply_defaults();
        }
        Ok(file)
    }

    /// Serialize back to YAML, omitting defaulted fields.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Index the declared modules by name.
    pub fn modules_by_name(&self) -> BTreeMap<&str, &Module> {
        self.modules
            .iter()
            .map(|module| (module.name.as_str(), module))
            .collect()
    }
}
