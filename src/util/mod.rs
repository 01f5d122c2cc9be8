//! Shared utilities

pub mod paths;
pub mod process;

pub use process::ProcessBuilder;
