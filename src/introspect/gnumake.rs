//! Build-descriptor introspection via GNU make's variable database.
//!
//! `make --print-data-base` annotates every variable with its origin; the
//! introspector keeps file-origin variables whose values are absolute paths
//! and classifies them by on-disk existence. `MAKEFILE_LIST` supplies the
//! transitive descriptor list used for synchronization.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use regex::Regex;

use crate::core::site::Settings;
use crate::introspect::{is_reserved_variable, Dependency, Introspector};
use crate::util::process::{find_executable, ProcessBuilder};

/// Introspector backed by a spawned `make` process.
#[derive(Debug, Clone)]
pub struct GnuMakeIntrospector {
    make_program: PathBuf,
}

impl GnuMakeIntrospector {
    /// Locate `make` on the PATH.
    pub fn new() -> Result<Self> {
        let make_program = find_executable("make")
            .context("`make` is required for build-descriptor introspection")?;
        Ok(GnuMakeIntrospector { make_program })
    }

    /// Use a specific make binary.
    pub fn with_program(make_program: impl Into<PathBuf>) -> Self {
        GnuMakeIntrospector {
            make_program: make_program.into(),
        }
    }

    fn dump_database(
        &self,
        path: &Path,
        variables: &BTreeMap<String, String>,
    ) -> Result<String> {
        let mut builder = ProcessBuilder::new(&self.make_program)
            .args([
                "--print-data-base",
                "--question",
                "--keep-going",
                "--no-builtin-rules",
                "--no-builtin-variables",
            ])
            .cwd(path);

        for (variable, value) in variables {
            builder = builder.env(variable, value);
        }

        // --question exits non-zero whenever targets are out of date, and
        // unresolved includes add errors of their own; the database is still
        // printed, so only a spawn failure is fatal here.
        let run = builder
            .exec_merged()
            .with_context(|| format!("failed to introspect {}", path.display()))?;

        tracing::debug!(
            "Introspected {} (make exit code {})",
            path.display(),
            run.exit_code
        );
        Ok(run.log)
    }
}

impl Introspector for GnuMakeIntrospector {
    fn introspect(
        &self,
        path: &Path,
        name: &str,
        variable_name: &str,
        settings: &Settings,
        variables: &BTreeMap<String, String>,
    ) -> Result<Dependency> {
        let path = crate::util::paths::expand(path);
        let path = if path.ends_with("Makefile") {
            path.parent().map(Path::to_path_buf).unwrap_or(path)
        } else {
            path
        };
        if !path.join("Makefile").exists() {
            bail!("no Makefile found in {}", path.display());
        }

        let mut merged = settings.variables();
        merged.extend(variables.clone());

        let database = self.dump_database(&path, &merged)?;
        let mut dependency = parse_database(&database, &path);
        dependency.name = name.to_string();
        dependency.variable_name = variable_name.to_string();
        Ok(dependency)
    }
}

/// Parse a `make --print-data-base` dump into a dependency record.
fn parse_database(database: &str, path: &Path) -> Dependency {
    // A definition is the origin comment followed by the assignment line:
    //   # makefile (from 'configure/RELEASE', line 12)
    //   ASYN := /cds/group/pcds/epics/R7.0.2-2.0/modules/asyn/R4.39-1.0.1
    let origin = Regex::new(r"^# (makefile|environment|command line|automatic|default)")
        .expect("static regex");
    let assignment =
        Regex::new(r"^(?P<variable>[A-Za-z_][A-Za-z0-9_]*)\s*:?=\s*(?P<value>.*)$")
            .expect("static regex");

    let mut dependency = Dependency {
        path: path.to_path_buf(),
        ..Default::default()
    };

    let mut last_origin_is_file = false;
    for line in database.lines() {
        if let Some(captures) = origin.captures(line) {
            last_origin_is_file = &captures[1] == "makefile";
            continue;
        }

        let Some(captures) = assignment.captures(line) else {
            last_origin_is_file = false;
            continue;
        };
        let from_file = std::mem::take(&mut last_origin_is_file);

        let variable = &captures["variable"];
        let value = captures["value"].trim();

        if variable == "MAKEFILE_LIST" {
            dependency.makefile_list = value
                .split_whitespace()
                .map(PathBuf::from)
                .collect();
            continue;
        }

        if !from_file || is_reserved_variable(variable) {
            continue;
        }

        // Dependency-path variables hold exactly one absolute path.
        if !value.starts_with('/') || value.split_whitespace().count() != 1 {
            continue;
        }

        let target = PathBuf::from(value);
        if target.exists() {
            dependency.dependencies.insert(variable.to_string(), target);
        } else {
            dependency.missing_paths.insert(variable.to_string(), target);
        }
    }

    dependency
}
