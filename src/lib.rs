//! epibuild - a declarative downloader, synchronizer, and build orchestrator
//! for EPICS-style module trees.
//!
//! This crate provides the core library functionality for epibuild,
//! including specification aggregation, path-convention resolution,
//! recursive dependency discovery, build ordering, and build-descriptor
//! synchronization.

pub mod builder;
pub mod core;
pub mod errors;
pub mod graph;
pub mod introspect;
pub mod ops;
pub mod sources;
pub mod sync;
pub mod syspkg;
pub mod util;

/// Test fakes for the introspector and source-fetcher seams.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests.
#[cfg(test)]
pub mod test_support;

pub use core::{
    site::{Settings, SiteConfig},
    spec::{Application, GitSource, MakeOptions, Module, Requirements, SpecificationFile},
    specs::Specifications,
    version::VersionInfo,
};

pub use graph::RecursiveInspector;
pub use introspect::{Dependency, DependencyGroup, Introspector};
