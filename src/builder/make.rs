//! Native build execution via `make`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::core::spec::MakeOptions;
use crate::util::paths;
use crate::util::process::{find_executable, ProcessBuilder};

/// Outcome of one make invocation.
#[derive(Debug, Clone)]
pub struct MakeResult {
    /// The variable name of the module that was built.
    pub variable: String,

    /// Directory the build ran in.
    pub path: PathBuf,

    /// Targets that were requested.
    pub targets: Vec<String>,

    pub success: bool,
    pub exit_code: i32,

    /// Whether the watchdog terminated the build.
    pub timed_out: bool,

    /// Combined stdout and stderr.
    pub log: String,

    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl MakeResult {
    /// Wall-clock build duration.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Run `make` for one module directory.
///
/// The configured parallelism and extra arguments are forwarded, the
/// workspace variable bindings are exported into the environment, and the
/// optional timeout arms the process watchdog. A failing build is a normal
/// `Ok` result with `success == false`; only spawn failures are errors.
pub fn call_make(
    path: &Path,
    variable: &str,
    targets: &[String],
    options: &MakeOptions,
    variables: &BTreeMap<String, String>,
    timeout: Option<Duration>,
) -> Result<MakeResult> {
    let path = paths::expand(path);
    let make_program =
        find_executable("make").context("`make` is required to build modules")?;

    let mut builder = ProcessBuilder::new(make_program)
        .arg(format!("-j{}", options.parallel.max(1)))
        .args(&options.args)
        .args(targets)
        .cwd(&path)
        .timeout(timeout);
    for (key, value) in variables {
        builder = builder.env(key, value);
    }

    tracing::info!("Building {} in {}", variable, path.display());
    tracing::debug!("Running: {}", builder.display_command());

    let started_at = Local::now();
    let run = builder
        .exec_merged()
        .with_context(|| format!("failed to run make in {}", path.display()))?;
    let finished_at = Local::now();

    let result = MakeResult {
        variable: variable.to_string(),
        path,
        targets: targets.to_vec(),
        success: run.exit_code == 0 && !run.timed_out,
        exit_code: run.exit_code,
        timed_out: run.timed_out,
        log: run.log,
        started_at,
        finished_at,
    };

    if result.success {
        tracing::info!(
            "Built {} in {:.1}s",
            variable,
            result.elapsed().num_milliseconds() as f64 / 1000.0
        );
    } else if result.timed_out {
        tracing::error!("Build of {} timed out", variable);
    } else {
        tracing::error!("Build of {} failed with exit code {}", variable, result.exit_code);
    }

    Ok(result)
}
