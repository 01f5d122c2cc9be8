//! High-level operations backing the CLI subcommands.

pub mod build;
pub mod download;
pub mod inspect;
pub mod patch;
pub mod release_site;
pub mod requirements;
pub mod sync;
