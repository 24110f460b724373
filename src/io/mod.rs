//! Input/output helpers.
//!
//! - snapshot JSON read/write (`snapshot`)
//! - long-format series export to CSV (`export`)

pub mod export;
pub mod snapshot;

pub use export::*;
pub use snapshot::*;
