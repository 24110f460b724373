//! Numeric transforms over published series.

pub mod smooth;

pub use smooth::*;
