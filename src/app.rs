//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and resolves configuration
//! - installs the tracing subscriber
//! - runs the requested command (serve, summary, export, view)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, ExportArgs, ExportFormat, ServeArgs, SourceArgs, SummaryArgs};
use crate::config::Config;
use crate::error::AppError;
use crate::report::{SeriesQuery, select};
use crate::service::Scheduler;

pub mod pipeline;

const DEFAULT_LOG_FILTER: &str = "epi_rollup=info";

/// Entry point for the `epi` binary.
pub fn run() -> Result<(), AppError> {
    // `epi` and `epi --source sample` behave like `epi view ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    // The TUI owns the terminal; only log over it when explicitly asked to.
    let quiet = matches!(cli.command, Command::View(_)) && std::env::var_os("RUST_LOG").is_none();
    if !quiet {
        init_tracing();
    }

    let config = Config::from_env()?;
    match cli.command {
        Command::Serve(args) => handle_serve(args, config),
        Command::Summary(args) => handle_summary(args, &config),
        Command::Export(args) => handle_export(args, &config),
        Command::View(args) => handle_view(args, &config),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // A second init (e.g. from tests) is harmless; keep the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_serve(args: ServeArgs, mut config: Config) -> Result<(), AppError> {
    if args.source.snapshot.is_some() {
        return Err(AppError::config("`serve` aggregates live feeds; --snapshot is not supported."));
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(secs) = args.refresh_secs {
        if secs == 0 {
            return Err(AppError::config("--refresh-secs must be > 0."));
        }
        config.refresh_interval = Duration::from_secs(secs);
    }
    let bind: SocketAddr = config
        .bind
        .parse()
        .map_err(|e| AppError::config(format!("Invalid bind address '{}': {e}", config.bind)))?;

    let aggregator = Arc::new(pipeline::build_aggregator(&args.source, &config)?);
    info!(
        source = %aggregator.status().source,
        refresh_secs = config.refresh_interval.as_secs(),
        "starting"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::new(4, format!("Failed to start async runtime: {e}")))?;

    // Refreshing uses blocking HTTP, so the scheduler thread and the last
    // aggregator handle both live outside the runtime.
    let scheduler = Scheduler::start(Arc::clone(&aggregator), config.refresh_interval)?;
    let result = runtime.block_on(crate::server::serve(Arc::clone(&aggregator), bind));
    drop(runtime);
    scheduler.stop();
    result
}

fn handle_summary(args: SummaryArgs, config: &Config) -> Result<(), AppError> {
    let snapshot = pipeline::load_snapshot(&args.source, config)?;
    println!("{}", crate::report::format_summary(&snapshot));

    if args.plot {
        let query = SeriesQuery {
            transform: args.transform,
            ..SeriesQuery::new(args.metric, args.geo)
        };
        let view = select(&snapshot, &query).map_err(|e| AppError::config(e.to_string()))?;
        println!(
            "{}",
            crate::plot::render_ascii_series(&view, args.width, args.height)
        );
    }
    Ok(())
}

fn handle_export(args: ExportArgs, config: &Config) -> Result<(), AppError> {
    let snapshot = pipeline::load_snapshot(&args.source, config)?;
    match args.format {
        ExportFormat::Json => crate::io::write_snapshot_json(&args.out, &snapshot)?,
        ExportFormat::Csv => crate::io::write_series_csv(&args.out, &snapshot)?,
    }
    info!(path = %args.out.display(), format = ?args.format, "snapshot exported");
    Ok(())
}

fn handle_view(args: SourceArgs, config: &Config) -> Result<(), AppError> {
    if let Some(path) = &args.snapshot {
        let snapshot = crate::io::read_snapshot_json(path)?;
        return crate::tui::run(Arc::new(snapshot), None);
    }
    let aggregator = Arc::new(pipeline::build_aggregator(&args, config)?);
    let snapshot = aggregator.refresh()?;
    crate::tui::run(snapshot, Some(aggregator))
}

/// Rewrite argv so `epi` defaults to `epi view`.
///
/// Rules:
/// - `epi`                        -> `epi view`
/// - `epi --source sample ...`    -> `epi view --source sample ...`
/// - `epi --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("view".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "view".to_string());
    }
    argv
}
