//! Command-line parsing for the epidemiological rollup.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! aggregation code. Flags given here override `EPI_*` environment settings.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::Metric;
use crate::math::Transform;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "epi", version, about = "Belgian epidemiological feed aggregator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Refresh on a schedule and serve snapshots over HTTP.
    Serve(ServeArgs),
    /// Aggregate once and print the latest values per geography.
    Summary(SummaryArgs),
    /// Aggregate once and write the snapshot to a file.
    Export(ExportArgs),
    /// Launch the interactive terminal chart.
    View(SourceArgs),
}

/// Where feed records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Sciensano open-data endpoints.
    Live,
    /// Deterministic synthetic feeds.
    Sample,
    /// `cases.json`, `hospital.json`, `deaths.json` in `--feeds-dir`.
    Files,
}

/// Options shared by every command that needs a snapshot.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Feed source.
    #[arg(long, value_enum, default_value_t = SourceKind::Live)]
    pub source: SourceKind,

    /// Directory holding the three feed files (for `--source files`).
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub feeds_dir: PathBuf,

    /// Load a saved snapshot JSON instead of aggregating feeds.
    #[arg(long, value_name = "JSON", conflicts_with = "source")]
    pub snapshot: Option<PathBuf>,

    /// Drop this many trailing days from every metric (overrides EPI_SKIP_LAST*).
    #[arg(long)]
    pub skip_last: Option<usize>,

    /// Random seed for `--source sample`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of days for `--source sample`.
    #[arg(long, default_value_t = 240)]
    pub days: usize,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Listen address (overrides EPI_BIND).
    #[arg(long)]
    pub bind: Option<String>,

    /// Seconds between refreshes (overrides EPI_REFRESH_SECS).
    #[arg(long)]
    pub refresh_secs: Option<u64>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Render an ASCII plot of one series below the table.
    #[arg(long)]
    pub plot: bool,

    /// Metric to plot.
    #[arg(long, value_enum, default_value_t = Metric::NewCases)]
    pub metric: Metric,

    /// Geography code to plot.
    #[arg(long, default_value = "BE")]
    pub geo: String,

    /// Smoothing applied before plotting.
    #[arg(long, value_enum, default_value_t = Transform::Trailing)]
    pub transform: Transform,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// The `/data` snapshot document.
    Json,
    /// Long format: date,metric,geo,value.
    Csv,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output path.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub out: PathBuf,

    #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
    pub format: ExportFormat,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn summary_flags_parse() {
        let cli = Cli::parse_from([
            "epi", "summary", "--source", "sample", "--plot", "--metric", "inIcu", "--geo", "FL",
        ]);
        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(args.source.source, SourceKind::Sample);
        assert!(args.plot);
        assert_eq!(args.metric, Metric::InIcu);
        assert_eq!(args.transform, Transform::Trailing);
    }

    #[test]
    fn snapshot_conflicts_with_source() {
        let res = Cli::try_parse_from([
            "epi", "view", "--source", "sample", "--snapshot", "s.json",
        ]);
        assert!(res.is_err());
    }
}
