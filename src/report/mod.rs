//! Reporting utilities: series selection and formatted terminal output.

pub mod format;
pub mod query;

pub use format::{format_metric_table, format_summary};
pub use query::{QueryError, SeriesQuery, SeriesView, select};
