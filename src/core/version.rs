//! Module identity and version information.
//!
//! A [`VersionInfo`] is interchangeable with the [`Module`] it describes:
//! it is derived either from a module's git source or inferred from an
//! install path via the site's path conventions.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::site::Settings;
use crate::core::spec::{GitSource, Module};
use crate::core::BASE_MODULE_NAME;

/// Module name and version information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionInfo {
    /// The name (i.e. repository name) of the module.
    pub name: String,

    /// The base-module tag it was built against.
    pub base: String,

    /// The version tag name.
    pub tag: String,
}

impl VersionInfo {
    /// Infer identity from an install path using the site conventions.
    ///
    /// The path is normalized first, then tested against the module-path
    /// regexes and finally the base-path regexes; the first match wins.
    /// `None` is a normal, recoverable outcome meaning the path follows no
    /// configured convention.
    pub fn from_path(path: &Path, settings: &Settings) -> Option<Self> {
        let normalized = settings.site.normalize_path(path);
        let path_str = normalized.to_string_lossy();

        for regex in settings.site.compiled_module_regexes() {
            if let Some(captures) = regex.captures(&path_str) {
                let version = VersionInfo {
                    name: named_capture(&captures, "name"),
                    base: named_capture(&captures, "base"),
                    tag: named_capture(&captures, "tag"),
                };
                tracing::debug!("Module version path match {} -> {:?}", path_str, version);
                return Some(version);
            }
        }

        for regex in settings.site.compiled_base_regexes() {
            if let Some(captures) = regex.captures(&path_str) {
                let tag = named_capture(&captures, "tag");
                tracing::debug!("Base version path match {} -> {}", path_str, tag);
                return Some(VersionInfo {
                    name: BASE_MODULE_NAME.to_string(),
                    base: tag.clone(),
                    tag,
                });
            }
        }

        None
    }

    /// Derive version information from a declared module.
    pub fn from_module(module: &Module, settings: &Settings) -> Result<Self> {
        Ok(VersionInfo {
            name: module.name.clone(),
            base: settings.base_tag(),
            tag: module.version()?.to_string(),
        })
    }

    /// Create a specification [`Module`] out of this version.
    ///
    /// The git URL is derived from the site's URL template; it is not
    /// preserved losslessly across a path round-trip.
    pub fn to_module(&self, variable_name: &str, settings: &Settings) -> Module {
        let mut module = Module::new(&self.name);
        module.variable = variable_name.to_string();
        module.git = Some(GitSource::new(
            settings.site.git_url_for_version(self),
            &self.tag,
        ));
        module
    }
}

fn named_capture(captures: &regex::Captures<'_>, name: &str) -> String {
    captures
        .name(name)
        .map(|group| group.as_str().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

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
    fn test_from_module_path() {
        let settings = settings();
        let path = PathBuf::from("/cds/group/pcds/epics/R7.0.2-2.0/modules/asyn/R4.39-1.0.1");

        let version = VersionInfo::from_path(&path, &settings).unwrap();
        assert_eq!(version.name, "asyn");
        assert_eq!(version.base, "R7.0.2-2.0");
        assert_eq!(version.tag, "R4.39-1.0.1");
    }

    #[test]
    fn test_from_base_path() {
        let settings = settings();
        let path = PathBuf::from("/cds/group/pcds/epics/base/R7.0.2-2.0");

        let version = VersionInfo::from_path(&path, &settings).unwrap();
        assert_eq!(version.name, BASE_MODULE_NAME);
        assert_eq!(version.tag, "R7.0.2-2.0");
    }

    #[test]
    fn test_from_legacy_prefix() {
        let settings = settings();
        let path = PathBuf::from("/reg/g/pcds/epics/R7.0.2-2.0/modules/asyn/R4.39-1.0.1");

        let version = VersionInfo::from_path(&path, &settings).unwrap();
        assert_eq!(version.name, "asyn");
    }

    #[test]
    fn test_unconventional_path_is_none() {
        let settings = settings();
        assert!(VersionInfo::from_path(Path::new("/opt/custom/asyn"), &settings).is_none());
    }

    #[test]
    fn test_path_round_trip() {
        let settings = settings();

        let mut module = Module::new("asyn");
        module.git = Some(GitSource::new("https://github.com/slac-epics/asyn", "R4.39-1.0.1"));

        let path = settings.path_for_module(&module);
        let version = VersionInfo::from_path(&path, &settings).unwrap();

        assert_eq!(version.name, module.name);
        assert_eq!(version.tag, module.version().unwrap());
    }

    #[test]
    fn test_to_module_uses_url_template() {
        let settings = settings();
        let version = VersionInfo {
            name: "asyn".to_string(),
            base: "R7.0.2-2.0".to_string(),
            tag: "R4.39-1.0.1".to_string(),
        };

        let module = version.to_module("ASYN", &settings);
        assert_eq!(module.name, "asyn");
        assert_eq!(module.variable, "ASYN");
        let git = module.git.unwrap();
        assert_eq!(git.url, "https://github.com/slac-epics/asyn");
        assert_eq!(git.tag, "R4.39-1.0.1");
    }

    #[test]
    fn test_module_version_round_trip() {
        let settings = settings();

        let mut module = Module::new("asyn");
        module.git = Some(GitSource::new("https://github.com/slac-epics/asyn", "R4.39-1.0.1"));

        let version = VersionInfo::from_module(&module, &settings).unwrap();
        let back = version.to_module("ASYN", &settings);

        assert_eq!(back.name, module.name);
        assert_eq!(back.version().unwrap(), module.version().unwrap());
    }
}
