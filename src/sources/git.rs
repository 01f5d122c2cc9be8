//! Git-backed source fetching via the `git` CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::spec::Module;
use crate::errors::DownloadError;
use crate::sources::SourceFetcher;
use crate::util::process::{find_executable, ProcessBuilder};

/// Fetches pinned module revisions with shallow, single-branch clones.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    git_program: PathBuf,
}

impl GitFetcher {
    /// Locate `git` on the PATH.
    pub fn new() -> Result<Self> {
        let git_program =
            find_executable("git").context("`git` is required to download modules")?;
        Ok(GitFetcher { git_program })
    }

    /// Use a specific git binary.
    pub fn with_program(git_program: impl Into<PathBuf>) -> Self {
        GitFetcher {
            git_program: git_program.into(),
        }
    }
}

impl SourceFetcher for GitFetcher {
    fn fetch(&self, module: &Module, target: &Path) -> Result<()> {
        let git = module.git.as_ref().ok_or_else(|| DownloadError::NotGitBacked {
            name: module.name.clone(),
        })?;

        let mut builder = ProcessBuilder::new(&self.git_program)
            .arg("clone")
            .arg(&git.url)
            .args(["--depth", &git.depth.to_string()])
            .args(["--single-branch", "--branch", &git.tag]);
        if git.recursive {
            builder = builder.arg("--recursive");
        }
        builder = builder
            .args(git.args.split_whitespace())
            .arg(target);

        tracing::debug!("Running: {}", builder.display_command());
        let status = builder.status()?;
        if !status.success() {
            return Err(DownloadError::CloneFailed {
                url: git.url.clone(),
                code: status.code().unwrap_or(-1),
            }
            .into());
        }
        Ok(())
    }
}
