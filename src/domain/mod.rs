//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the static geographic hierarchies (`Hierarchy`, `GeoNode`)
//! - published metrics and skip-last policy (`Metric`, `SkipLast`)
//! - the aggregation result (`Snapshot`, `Series`)

pub mod geo;
pub mod types;

pub use geo::*;
pub use types::*;
