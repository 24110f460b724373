//! Feed sources.
//!
//! A [`FeedSource`] hands the orchestrator all three raw feeds for one refresh,
//! or fails as a whole. Implementations:
//!
//! - [`SciensanoClient`]: live HTTP fetch of the published JSON files
//! - [`FileFeeds`]: three local JSON files with the same shape
//! - [`SampleFeeds`]: deterministic synthetic feeds for offline use

use thiserror::Error;

use crate::aggregate::RollupOverflow;
use crate::domain::Metric;

pub mod file;
pub mod records;
pub mod sample;
pub mod sciensano;

pub use file::FileFeeds;
pub use records::*;
pub use sample::{SampleConfig, SampleFeeds};
pub use sciensano::{FeedUrls, SciensanoClient};

/// Which of the three upstream feeds an error or record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Cases,
    Hospital,
    Deaths,
}

impl Feed {
    pub const ALL: [Feed; 3] = [Feed::Cases, Feed::Hospital, Feed::Deaths];

    pub fn name(self) -> &'static str {
        match self {
            Feed::Cases => "cases",
            Feed::Hospital => "hospital",
            Feed::Deaths => "deaths",
        }
    }
}

impl std::fmt::Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{feed} feed request failed: {message}")]
    Http { feed: Feed, message: String },

    #[error("{feed} feed returned status {status}")]
    Status { feed: Feed, status: u16 },

    #[error("{feed} feed payload could not be decoded: {message}")]
    Decode { feed: Feed, message: String },

    #[error("{feed} feed file '{path}' could not be read: {message}")]
    Io {
        feed: Feed,
        path: String,
        message: String,
    },

    #[error("feed source unavailable: {0}")]
    Unavailable(String),

    #[error("{metric} {source}")]
    Overflow {
        metric: Metric,
        #[source]
        source: RollupOverflow,
    },
}

impl FeedError {
    pub fn feed(&self) -> Option<Feed> {
        match self {
            FeedError::Http { feed, .. }
            | FeedError::Status { feed, .. }
            | FeedError::Decode { feed, .. }
            | FeedError::Io { feed, .. } => Some(*feed),
            FeedError::Unavailable(_) | FeedError::Overflow { .. } => None,
        }
    }
}

/// Supplies the three raw feeds for one refresh.
///
/// A source must return either all three feeds or an error; the orchestrator
/// never aggregates a partial set.
pub trait FeedSource: Send + Sync {
    fn fetch(&self) -> Result<RawFeeds, FeedError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

impl<T: FeedSource + ?Sized> FeedSource for Box<T> {
    fn fetch(&self) -> Result<RawFeeds, FeedError> {
        (**self).fetch()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
