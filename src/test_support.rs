//! Shared test doubles.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::core::site::{Settings, SiteConfig};
use crate::core::spec::{GitSource, Module};
use crate::core::specs::Specifications;
use crate::core::BASE_MODULE_NAME;
use crate::introspect::{Dependency, Introspector};
use crate::sources::SourceFetcher;

/// A workspace whose site conventions live under a temp directory.
///
/// Base tag `R7.0.2-2.0`; module paths follow
/// `<top>/<base>/modules/<name>/<tag>`.
pub fn workspace_under(top: &Path) -> Specifications {
    let top = crate::util::paths::expand(top);
    let site = SiteConfig {
        epics_site_top: top.clone(),
        module_path_regexes: vec![format!(
            "^{}/(?P<base>[^/]+)/modules/(?P<name>[^/]+)/(?P<tag>[^/]+)/?$",
            top.display()
        )],
        base_path_regexes: vec![format!("^{}/base/(?P<tag>[^/]+)/?$", top.display())],
        ..Default::default()
    };

    let mut settings = Settings {
        site,
        ..Default::default()
    };
    let mut base = Module::new(BASE_MODULE_NAME);
    base.git = Some(GitSource::new("https://example.com/epics-base", "R7.0.2-2.0"));
    settings.set_base_version(&base).unwrap();

    Specifications {
        settings,
        ..Default::default()
    }
}

/// Introspector returning canned dependency records keyed by module path.
#[derive(Debug, Default)]
pub struct FakeIntrospector {
    records: BTreeMap<PathBuf, Dependency>,
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeIntrospector {
    /// Register the record returned for `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, dependency: Dependency) {
        let path = crate::util::paths::expand(path.into());
        self.records.insert(path, dependency);
    }

    /// Every path introspected so far, in call order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl Introspector for FakeIntrospector {
    fn introspect(
        &self,
        path: &Path,
        name: &str,
        variable_name: &str,
        _settings: &Settings,
        _variables: &BTreeMap<String, String>,
    ) -> Result<Dependency> {
        let path = crate::util::paths::expand(path);
        self.calls.lock().unwrap().push(path.clone());

        let Some(record) = self.records.get(&path) else {
            bail!("no canned record for {}", path.display());
        };
        let mut dependency = record.clone();
        dependency.path = path;
        dependency.name = name.to_string();
        dependency.variable_name = variable_name.to_string();
        Ok(dependency)
    }
}

/// Fetcher that creates the target directory and records the request.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    fetched: Mutex<Vec<String>>,
    fail_for: Vec<String>,
}

impl FakeFetcher {
    /// Make fetches of the named modules fail.
    pub fn failing_for<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FakeFetcher {
            fetched: Mutex::new(Vec::new()),
            fail_for: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Names of modules fetched so far, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl SourceFetcher for FakeFetcher {
    fn fetch(&self, module: &Module, target: &Path) -> Result<()> {
        if self.fail_for.contains(&module.name) {
            bail!("simulated fetch failure for `{}`", module.name);
        }
        std::fs::create_dir_all(target)?;
        std::fs::write(target.join("Makefile"), "all:\n")?;
        self.fetched.lock().unwrap().push(module.name.clone());
        Ok(())
    }
}
