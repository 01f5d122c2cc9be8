//! Core data model: specification records, site conventions, and the
//! specification aggregator.

pub mod site;
pub mod spec;
pub mod specs;
pub mod version;

/// Well-known name of the base module every other module builds against.
pub const BASE_MODULE_NAME: &str = "epics-base";

/// Build-descriptor variable bound to the base module's install path.
pub const BASE_VARIABLE: &str = "EPICS_BASE";
