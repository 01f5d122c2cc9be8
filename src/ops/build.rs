//! Ordered building of the declared workspace.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::builder::make::{call_make, MakeResult};
use crate::builder::plan::build_order;
use crate::core::spec::Application;
use crate::core::specs::{should_include, Specifications};
use crate::core::BASE_VARIABLE;
use crate::errors::BuildError;
use crate::introspect::{Dependency, Introspector};

/// Filters and policy for a workspace build.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub only: Vec<String>,
    pub skip: Vec<String>,

    /// Abort at the first failing module instead of building the rest.
    pub stop_on_failure: bool,

    /// Run the `clean` target before `all`.
    pub clean: bool,

    /// Per-module build timeout.
    pub timeout: Option<Duration>,
}

impl BuildOptions {
    fn targets(&self) -> Vec<String> {
        if self.clean {
            vec!["clean".to_string(), "all".to_string()]
        } else {
            vec!["all".to_string()]
        }
    }
}

/// Outcome of a workspace build.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// The planned order, including modules that were never reached.
    pub order: Vec<String>,

    /// One result per module actually built.
    pub results: Vec<MakeResult>,
}

impl BuildReport {
    pub fn success(&self) -> bool {
        self.results.iter().all(|result| result.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &MakeResult> {
        self.results.iter().filter(|result| !result.success)
    }
}

/// Build every declared module that is present on disk, in dependency order.
///
/// Callers are expected to have validated the workspace (base declared and
/// installed) beforehand. Modules excluded by the filters still participate
/// in ordering; they are assumed up to date.
pub fn build_all(
    specs: &Specifications,
    introspector: &dyn Introspector,
    options: &BuildOptions,
) -> Result<BuildReport> {
    let variables = specs.variables_to_sync();

    let mut graph: BTreeMap<String, Dependency> = BTreeMap::new();
    let mut excluded = options.skip.clone();
    for module in specs.all_modules() {
        let path = specs.settings.path_for_module(module);
        if !path.is_dir() {
            tracing::warn!(
                "Module `{}` not present at {}; skipping build",
                module.name,
                path.display()
            );
            continue;
        }

        let dependency = introspector
            .introspect(&path, &module.name, &module.variable, &specs.settings, &variables)
            .with_context(|| format!("failed to inspect module `{}`", module.name))?;
        graph.insert(module.variable.clone(), dependency);

        if !should_include(module, &options.only, &options.skip) {
            excluded.push(module.variable.clone());
        }
    }

    // Base always leads when it is part of the build; descriptors rarely
    // declare an edge on it even though every module needs it.
    let order = build_order(&graph, &[BASE_VARIABLE.to_string()], &excluded);
    tracing::info!("Build order: {}", order.join(" -> "));

    let by_variable = specs.variable_name_to_module();
    let mut report = BuildReport {
        order: order.clone(),
        results: Vec::new(),
    };

    for variable in &order {
        let Some(module) = by_variable.get(variable.as_str()).copied() else {
            continue;
        };
        let path = specs.settings.path_for_module(module);
        let result = call_make(
            &path,
            variable,
            &options.targets(),
            &module.make,
            &variables,
            options.timeout,
        )?;

        let failed = !result.success;
        let timed_out = result.timed_out;
        let exit_code = result.exit_code;
        report.results.push(result);

        if failed && options.stop_on_failure {
            let error = if timed_out {
                BuildError::Timeout {
                    variable: variable.clone(),
                }
            } else {
                BuildError::MakeFailed {
                    variable: variable.clone(),
                    code: exit_code,
                }
            };
            return Err(error.into());
        }
    }

    Ok(report)
}

/// Build an application tree after its modules are in place.
pub fn build_application(
    specs: &Specifications,
    application: &Application,
    path: &Path,
    options: &BuildOptions,
) -> Result<MakeResult> {
    let variables = specs.variables_to_sync();
    let name = application.binary.as_deref().unwrap_or("application");
    let result = call_make(
        path,
        name,
        &options.targets(),
        &application.make,
        &variables,
        options.timeout,
    )?;

    if !result.success && options.stop_on_failure {
        let error = if result.timed_out {
            BuildError::Timeout {
                variable: name.to_string(),
            }
        } else {
            BuildError::MakeFailed {
                variable: name.to_string(),
                code: result.exit_code,
            }
        };
        return Err(error.into());
    }
    Ok(result)
}
