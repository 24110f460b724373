//! Terminal plotting helpers.

pub mod ascii;

pub use ascii::render_ascii_series;
