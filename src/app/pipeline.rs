//! Shared "snapshot pipeline" logic used by the CLI, server and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! flags + env -> feed source -> aggregator -> snapshot
//!
//! The front-ends can then focus on presentation (printing, HTTP, widgets).

use std::sync::Arc;

use crate::cli::{SourceArgs, SourceKind};
use crate::config::Config;
use crate::data::{FeedSource, FileFeeds, SampleConfig, SampleFeeds, SciensanoClient};
use crate::domain::{SkipLast, Snapshot};
use crate::error::AppError;
use crate::service::Aggregator;

/// Skip-last policy after applying `--skip-last` over the configured one.
pub fn skip_last_policy(args: &SourceArgs, config: &Config) -> SkipLast {
    match args.skip_last {
        Some(n) => SkipLast::uniform(n),
        None => config.skip_last,
    }
}

/// Construct the feed source selected on the command line.
pub fn build_source(args: &SourceArgs, config: &Config) -> Result<Box<dyn FeedSource>, AppError> {
    let source: Box<dyn FeedSource> = match args.source {
        SourceKind::Live => Box::new(SciensanoClient::new(config.urls.clone(), config.http_timeout)?),
        SourceKind::Sample => {
            if args.days == 0 {
                return Err(AppError::config("--days must be > 0."));
            }
            Box::new(SampleFeeds::new(SampleConfig {
                days: args.days,
                seed: args.seed,
                ..SampleConfig::default()
            }))
        }
        SourceKind::Files => Box::new(FileFeeds::in_dir(&args.feeds_dir)),
    };
    Ok(source)
}

/// Aggregator over the selected source, not yet refreshed.
pub fn build_aggregator(args: &SourceArgs, config: &Config) -> Result<Aggregator, AppError> {
    let source = build_source(args, config)?;
    Ok(Aggregator::new(source, skip_last_policy(args, config)))
}

/// A snapshot for one-shot commands: read from `--snapshot`, or aggregate once.
pub fn load_snapshot(args: &SourceArgs, config: &Config) -> Result<Arc<Snapshot>, AppError> {
    if let Some(path) = &args.snapshot {
        let snapshot = crate::io::read_snapshot_json(path)?;
        return Ok(Arc::new(snapshot));
    }
    let aggregator = build_aggregator(args, config)?;
    Ok(aggregator.refresh()?)
}
