//! Build ordering and native build execution.

pub mod make;
pub mod plan;

pub use make::{call_make, MakeResult};
pub use plan::build_order;
