//! Typed error taxonomy.
//!
//! Library functions generally return `anyhow::Result`; the enums here cover
//! the failures callers branch on (reusing an occupied download target,
//! stop-on-failure build policy, specification preconditions).

use std::path::PathBuf;

use thiserror::Error;

/// Malformed or contradictory specification state.
#[derive(Debug, Error)]
pub enum SpecificationError {
    #[error("epics-base may only be declared once; found a second time in {path}")]
    BaseDeclaredTwice { path: PathBuf },

    #[error("epics-base not found in the loaded specification files")]
    BaseMissing,

    #[error(
        "epics-base is required to introspect and download dependencies, \
         but its install path does not exist: {path}"
    )]
    BasePathMissing { path: PathBuf },

    #[error("module not found in specifications: `{name}`")]
    ModuleNotFound { name: String },
}

/// Failure while materializing a module from its source.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Recoverable: the caller may choose to reuse the existing directory.
    #[error("target directory already exists and is not empty: {path}")]
    TargetExists { path: PathBuf },

    #[error("a file exists where the module directory should go: {path}")]
    TargetNotADirectory { path: PathBuf },

    #[error("failed to download {url}; git returned exit code {code}")]
    CloneFailed { url: String, code: i32 },

    #[error("module `{name}` has no git source to download from")]
    NotGitBacked { name: String },
}

impl DownloadError {
    /// The occupied target path, for callers that reuse it.
    pub fn existing_path(&self) -> Option<&PathBuf> {
        match self {
            DownloadError::TargetExists { path } => Some(path),
            _ => None,
        }
    }
}

/// Native build tool failure.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to build `{variable}`: make exited with code {code}")]
    MakeFailed { variable: String, code: i32 },

    #[error("build of `{variable}` timed out")]
    Timeout { variable: String },
}
