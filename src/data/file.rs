//! Feeds read from local JSON files (same shape as the published feeds).

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use serde::de::DeserializeOwned;

use crate::data::{Feed, FeedError, FeedSource, RawFeeds};

#[derive(Debug, Clone)]
pub struct FileFeeds {
    pub cases: PathBuf,
    pub hospital: PathBuf,
    pub deaths: PathBuf,
}

impl FileFeeds {
    /// Expect `cases.json`, `hospital.json` and `deaths.json` inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            cases: dir.join("cases.json"),
            hospital: dir.join("hospital.json"),
            deaths: dir.join("deaths.json"),
        }
    }

    fn path(&self, feed: Feed) -> &PathBuf {
        match feed {
            Feed::Cases => &self.cases,
            Feed::Hospital => &self.hospital,
            Feed::Deaths => &self.deaths,
        }
    }

    fn read<T: DeserializeOwned>(&self, feed: Feed) -> Result<Vec<T>, FeedError> {
        let path = self.path(feed);
        let file = File::open(path).map_err(|e| FeedError::Io {
            feed,
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| FeedError::Decode {
            feed,
            message: e.to_string(),
        })
    }
}

impl FeedSource for FileFeeds {
    fn fetch(&self) -> Result<RawFeeds, FeedError> {
        Ok(RawFeeds {
            cases: self.read(Feed::Cases)?,
            hospital: self.read(Feed::Hospital)?,
            deaths: self.read(Feed::Deaths)?,
        })
    }

    fn describe(&self) -> String {
        let dir = self
            .cases
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        format!("files ({dir})")
    }
}
