//! Sciensano open-data integration.
//!
//! The three feeds are plain JSON arrays published at stable URLs. Each refresh
//! downloads all of them; any failure aborts the whole fetch.

use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::data::{Feed, FeedError, FeedSource, RawFeeds};

pub const DEFAULT_CASES_URL: &str = "https://epistat.sciensano.be/Data/COVID19BE_CASES_AGESEX.json";
pub const DEFAULT_HOSPITAL_URL: &str = "https://epistat.sciensano.be/Data/COVID19BE_HOSP.json";
pub const DEFAULT_DEATHS_URL: &str = "https://epistat.sciensano.be/Data/COVID19BE_MORT.json";

/// Where to download each feed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedUrls {
    pub cases: String,
    pub hospital: String,
    pub deaths: String,
}

impl FeedUrls {
    pub fn url(&self, feed: Feed) -> &str {
        match feed {
            Feed::Cases => &self.cases,
            Feed::Hospital => &self.hospital,
            Feed::Deaths => &self.deaths,
        }
    }
}

impl Default for FeedUrls {
    fn default() -> Self {
        Self {
            cases: DEFAULT_CASES_URL.to_string(),
            hospital: DEFAULT_HOSPITAL_URL.to_string(),
            deaths: DEFAULT_DEATHS_URL.to_string(),
        }
    }
}

pub struct SciensanoClient {
    client: Client,
    urls: FeedUrls,
}

impl SciensanoClient {
    pub fn new(urls: FeedUrls, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("epi-rollup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, urls })
    }

    fn fetch_feed<T: DeserializeOwned>(&self, feed: Feed) -> Result<Vec<T>, FeedError> {
        let url = self.urls.url(feed);
        let start = Instant::now();

        let resp = self.client.get(url).send().map_err(|e| FeedError::Http {
            feed,
            message: e.to_string(),
        })?;

        if !resp.status().is_success() {
            return Err(FeedError::Status {
                feed,
                status: resp.status().as_u16(),
            });
        }

        let rows: Vec<T> = resp.json().map_err(|e| FeedError::Decode {
            feed,
            message: e.to_string(),
        })?;

        debug!(
            feed = feed.name(),
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fetched feed"
        );
        Ok(rows)
    }
}

impl FeedSource for SciensanoClient {
    fn fetch(&self) -> Result<RawFeeds, FeedError> {
        Ok(RawFeeds {
            cases: self.fetch_feed(Feed::Cases)?,
            hospital: self.fetch_feed(Feed::Hospital)?,
            deaths: self.fetch_feed(Feed::Deaths)?,
        })
    }

    fn describe(&self) -> String {
        let host = self
            .urls
            .cases
            .split("//")
            .nth(1)
            .and_then(|rest| rest.split('/').next())
            .unwrap_or(&self.urls.cases);
        format!("sciensano ({host})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_urls_point_at_published_files() {
        let urls = FeedUrls::default();
        assert!(urls.url(Feed::Cases).ends_with("COVID19BE_CASES_AGESEX.json"));
        assert!(urls.url(Feed::Hospital).ends_with("COVID19BE_HOSP.json"));
        assert!(urls.url(Feed::Deaths).ends_with("COVID19BE_MORT.json"));
    }

    #[test]
    fn describe_names_the_host() {
        let client = SciensanoClient::new(FeedUrls::default(), Duration::from_secs(1)).unwrap();
        assert_eq!(client.describe(), "sciensano (epistat.sciensano.be)");
    }

    #[test]
    fn unreachable_host_is_an_http_error() {
        let urls = FeedUrls {
            cases: "http://127.0.0.1:9/cases.json".to_string(),
            ..FeedUrls::default()
        };
        let client = SciensanoClient::new(urls, Duration::from_secs(2)).unwrap();
        match client.fetch() {
            Err(FeedError::Http { feed, .. }) => assert_eq!(feed, Feed::Cases),
            other => panic!("expected http error, got {other:?}"),
        }
    }
}
