//! Site conventions and workspace settings.
//!
//! [`SiteConfig`] is the site-configurable table of path regexes, URL
//! templates, and legacy-prefix rewrites. [`Settings`] layers the per-workspace
//! state derived from the declared base module on top of it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::version::VersionInfo;
use crate::core::{spec::Module, BASE_MODULE_NAME, BASE_VARIABLE};
use crate::util::paths;

/// Site settings for the builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteConfig {
    /// Root under which base and module trees live.
    pub epics_site_top: PathBuf,

    /// Ordered regexes matching module install paths.
    ///
    /// Named capture groups: `base`, `name`, `tag`.
    #[serde(default)]
    pub module_path_regexes: Vec<String>,

    /// Ordered regexes matching base-module install paths (captures `tag`).
    #[serde(default)]
    pub base_path_regexes: Vec<String>,

    /// Extra variables synchronized into every build descriptor.
    #[serde(default)]
    pub extra_variables: BTreeMap<String, String>,

    /// URL template for inferred modules; `{name}`, `{base}`, and `{tag}`
    /// are substituted from the version information.
    #[serde(default = "default_git_url_template")]
    pub git_url_template: String,

    /// Legacy filesystem prefixes rewritten to current ones before matching.
    #[serde(default = "default_path_normalization")]
    pub path_normalization: BTreeMap<String, String>,
}

fn default_git_url_template() -> String {
    "https://github.com/slac-epics/{name}".to_string()
}

fn default_path_normalization() -> BTreeMap<String, String> {
    BTreeMap::from([(
        "^/reg/g/pcds/(.*)$".to_string(),
        "/cds/group/pcds/$1".to_string(),
    )])
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            epics_site_top: PathBuf::from("/cds/group/pcds/epics"),
            module_path_regexes: vec![
                r"^/cds/group/pcds/epics/(?P<base>[^/]+)/modules/(?P<name>[^/]+)/(?P<tag>[^/]+)/?$"
                    .to_string(),
            ],
            base_path_regexes: vec![
                r"^/cds/group/pcds/epics/base/(?P<tag>[^/]+)/?$".to_string(),
            ],
            extra_variables: BTreeMap::new(),
            git_url_template: default_git_url_template(),
            path_normalization: default_path_normalization(),
        }
    }
}

impl SiteConfig {
    /// Load a site configuration from a YAML or JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read site config {}", path.display()))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config: SiteConfig = if is_json {
            serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse site config {}", path.display()))?
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("failed to parse site config {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Compile-check every configured regex.
    pub fn validate(&self) -> Result<()> {
        for pattern in self
            .module_path_regexes
            .iter()
            .chain(&self.base_path_regexes)
            .chain(self.path_normalization.keys())
        {
            Regex::new(pattern).with_context(|| format!("invalid site regex: {pattern}"))?;
        }
        Ok(())
    }

    /// Normalize a path with the site normalization settings.
    ///
    /// Legacy network-share prefixes are rewritten to their current
    /// equivalents so that identity inference sees one canonical layout.
    pub fn normalize_path(&self, path: &Path) -> PathBuf {
        let mut path_str = paths::expand(path).to_string_lossy().into_owned();

        for (pattern, replacement) in &self.path_normalization {
            let Ok(regex) = Regex::new(pattern) else {
                tracing::debug!("Skipping invalid normalization regex: {}", pattern);
                continue;
            };
            let normalized = regex.replace(&path_str, replacement.as_str());
            if normalized != path_str {
                tracing::debug!("Normalized path {} -> {}", path_str, normalized);
                path_str = normalized.into_owned();
            }
        }

        PathBuf::from(path_str)
    }

    /// The git URL for an inferred module version.
    pub fn git_url_for_version(&self, version: &VersionInfo) -> String {
        self.git_url_template
            .replace("{name}", &version.name)
            .replace("{base}", &version.base)
            .replace("{tag}", &version.tag)
    }

    pub(crate) fn compiled_module_regexes(&self) -> impl Iterator<Item = Regex> + '_ {
        compile_all(&self.module_path_regexes)
    }

    pub(crate) fn compiled_base_regexes(&self) -> impl Iterator<Item = Regex> + '_ {
        compile_all(&self.base_path_regexes)
    }
}

fn compile_all(patterns: &[String]) -> impl Iterator<Item = Regex> + '_ {
    patterns.iter().filter_map(|pattern| match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(error) => {
            tracing::debug!("Skipping invalid site regex {}: {}", pattern, error);
            None
        }
    })
}

/// Per-workspace build settings, derived from the declared base module.
///
/// Read-only after workspace construction apart from caller-supplied
/// variable overlays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Install path of the base module.
    pub epics_base: PathBuf,

    /// Root under which support modules are installed.
    pub support: PathBuf,

    /// Caller-supplied variable overlay.
    #[serde(default)]
    pub extra_variables: BTreeMap<String, String>,

    #[serde(default)]
    pub site: SiteConfig,
}

impl Settings {
    /// Derive the base and support paths from the declared base module.
    pub fn set_base_version(&mut self, base: &Module) -> Result<()> {
        let version = base.version()?.to_string();
        match &base.install_path {
            Some(install_path) => {
                self.epics_base = paths::expand(install_path);
                // Keep the support tree keyed by the install directory name so
                // explicitly-located bases still share the site layout.
                let slot = self
                    .epics_base
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or(version);
                self.support = self.site.epics_site_top.join(slot).join("modules");
            }
            None => {
                self.epics_base = self.site.epics_site_top.join("base").join(&version);
                self.support = self.site.epics_site_top.join(&version).join("modules");
            }
        }
        Ok(())
    }

    /// The base module's version tag, as encoded in its install path.
    pub fn base_tag(&self) -> String {
        self.epics_base
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The install path for a declared module.
    ///
    /// An explicit `install_path` always wins; the base module maps to
    /// `epics_base`; everything else follows `support / name / tag` with
    /// branch tags normalized onto the release slot.
    pub fn path_for_module(&self, module: &Module) -> PathBuf {
        if let Some(install_path) = &module.install_path {
            return paths::expand(install_path);
        }
        if module.name == BASE_MODULE_NAME {
            return self.epics_base.clone();
        }
        let tag = module
            .version()
            .map(normalized_tag)
            .unwrap_or_default();
        self.support.join(&module.name).join(tag)
    }

    /// The install path for an inferred module version.
    pub fn path_for_version(&self, version: &VersionInfo) -> PathBuf {
        if version.name == BASE_MODULE_NAME {
            return self.epics_base.clone();
        }
        self.support
            .join(&version.name)
            .join(normalized_tag(&version.tag))
    }

    /// Variables for introspection and synchronization.
    pub fn variables(&self) -> BTreeMap<String, String> {
        let mut variables = BTreeMap::new();
        variables.insert(
            BASE_VARIABLE.to_string(),
            self.epics_base.display().to_string(),
        );
        variables.extend(self.site.extra_variables.clone());
        variables.extend(self.extra_variables.clone());
        variables
    }
}

/// Strip a `-branch` suffix so branch and release tags share one disk slot.
fn normalized_tag(tag: &str) -> String {
    tag.replace("-branch", "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spec::GitSource;

    fn settings_for_base(tag: &str) -> Settings {
        let mut settings = Settings::default();
        let mut base = Module::new(BASE_MODULE_NAME);
        base.git = Some(GitSource::new("https://github.com/slac-epics/epics-base", tag));
        settings.set_base_version(&base).unwrap();
        settings
    }

    #[test]
    fn test_base_paths_from_version() {
        let settings = settings_for_base("R7.0.2-2.0");

        assert_eq!(
            settings.epics_base,
            PathBuf::from("/cds/group/pcds/epics/base/R7.0.2-2.0")
        );
        assert_eq!(
            settings.support,
            PathBuf::from("/cds/group/pcds/epics/R7.0.2-2.0/modules")
        );
        assert_eq!(settings.base_tag(), "R7.0.2-2.0");
    }

    #[test]
    fn test_path_for_module_conventions() {
        let settings = settings_for_base("R7.0.2-2.0");

        let mut module = Module::new("asyn");
        module.git = Some(GitSource::new("https://example.com/asyn", "R4.39-1.0.1"));
        assert_eq!(
            settings.path_for_module(&module),
            PathBuf::from("/cds/group/pcds/epics/R7.0.2-2.0/modules/asyn/R4.39-1.0.1")
        );

        // Branch tags share the release slot.
        module.git = Some(GitSource::new("https://example.com/asyn", "R4.39-branch"));
        assert_eq!(
            settings.path_for_module(&module),
            PathBuf::from("/cds/group/pcds/epics/R7.0.2-2.0/modules/asyn/R4.39")
        );
    }

    #[test]
    fn test_explicit_install_path_wins() {
        let settings = settings_for_base("R7.0.2-2.0");

        let mut module = Module::new("asyn");
        module.install_path = Some(PathBuf::from("/opt/epics/asyn"));
        assert_eq!(settings.path_for_module(&module), PathBuf::from("/opt/epics/asyn"));
    }

    #[test]
    fn test_base_module_maps_to_epics_base() {
        let settings = settings_for_base("R7.0.2-2.0");

        let mut base = Module::new(BASE_MODULE_NAME);
        base.git = Some(GitSource::new("https://example.com/base", "R7.0.2-2.0"));
        assert_eq!(settings.path_for_module(&base), settings.epics_base);
    }

    #[test]
    fn test_normalize_path_rewrites_legacy_prefix() {
        let site = SiteConfig::default();
        assert_eq!(
            site.normalize_path(Path::new("/reg/g/pcds/epics/abc")),
            PathBuf::from("/cds/group/pcds/epics/abc")
        );
        assert_eq!(
            site.normalize_path(Path::new("/unmatched_path")),
            PathBuf::from("/unmatched_path")
        );
    }

    #[test]
    fn test_default_config_validates() {
        SiteConfig::default().validate().unwrap();
    }

    #[test]
    fn test_variables_include_overlays() {
        let mut settings = settings_for_base("R7.0.2-2.0");
        settings
            .extra_variables
            .insert("RE2C".to_string(), "re2c".to_string());

        let variables = settings.variables();
        assert_eq!(
            variables.get("EPICS_BASE").unwrap(),
            "/cds/group/pcds/epics/base/R7.0.2-2.0"
        );
        assert_eq!(variables.get("RE2C").unwrap(), "re2c");
    }
}
