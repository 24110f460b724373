//! Runtime configuration.
//!
//! Values come from the environment (optionally a `.env` file), falling back
//! to defaults. CLI flags are applied on top by `app`.

use std::time::Duration;

use crate::data::FeedUrls;
use crate::domain::{Metric, SkipLast};
use crate::error::AppError;

pub const DEFAULT_REFRESH_SECS: u64 = 3600;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub urls: FeedUrls,
    pub skip_last: SkipLast,
    pub refresh_interval: Duration,
    pub http_timeout: Duration,
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            urls: FeedUrls::default(),
            skip_last: SkipLast::default(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut cfg = Config::default();
        let get = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("EPI_CASES_URL") {
            cfg.urls.cases = url;
        }
        if let Some(url) = get("EPI_HOSPITAL_URL") {
            cfg.urls.hospital = url;
        }
        if let Some(url) = get("EPI_DEATHS_URL") {
            cfg.urls.deaths = url;
        }

        if let Some(raw) = get("EPI_SKIP_LAST") {
            let n = parse_count("EPI_SKIP_LAST", &raw)?;
            // A global count replaces every default; per-metric keys refine it.
            cfg.skip_last = SkipLast::uniform(n);
        }
        for metric in Metric::ALL {
            let key = skip_last_key(metric);
            if let Some(raw) = get(&key) {
                cfg.skip_last.set(metric, parse_count(&key, &raw)?);
            }
        }

        if let Some(raw) = get("EPI_REFRESH_SECS") {
            let secs = parse_count("EPI_REFRESH_SECS", &raw)?;
            if secs == 0 {
                return Err(AppError::config("EPI_REFRESH_SECS must be > 0."));
            }
            cfg.refresh_interval = Duration::from_secs(secs as u64);
        }
        if let Some(raw) = get("EPI_HTTP_TIMEOUT_SECS") {
            let secs = parse_count("EPI_HTTP_TIMEOUT_SECS", &raw)?;
            if secs == 0 {
                return Err(AppError::config("EPI_HTTP_TIMEOUT_SECS must be > 0."));
            }
            cfg.http_timeout = Duration::from_secs(secs as u64);
        }
        if let Some(bind) = get("EPI_BIND") {
            cfg.bind = bind;
        }

        Ok(cfg)
    }
}

/// `newCases` -> `EPI_SKIP_LAST_NEW_CASES`
pub fn skip_last_key(metric: Metric) -> String {
    let mut key = String::from("EPI_SKIP_LAST_");
    for (i, c) in metric.key().chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            key.push('_');
        }
        key.push(c.to_ascii_uppercase());
    }
    key
}

fn parse_count(key: &str, raw: &str) -> Result<usize, AppError> {
    raw.parse::<usize>()
        .map_err(|e| AppError::config(format!("Invalid {key}='{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = Config::from_lookup(|_| None).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.refresh_interval, Duration::from_secs(3600));
        assert_eq!(cfg.skip_last.get(Metric::NewCases), 3);
    }

    #[test]
    fn skip_last_keys_are_screaming_snake() {
        assert_eq!(skip_last_key(Metric::NewCases), "EPI_SKIP_LAST_NEW_CASES");
        assert_eq!(skip_last_key(Metric::InIcu), "EPI_SKIP_LAST_IN_ICU");
        assert_eq!(skip_last_key(Metric::Deaths), "EPI_SKIP_LAST_DEATHS");
    }

    #[test]
    fn global_then_per_metric_skip_last() {
        let cfg = Config::from_lookup(lookup(&[
            ("EPI_SKIP_LAST", "2"),
            ("EPI_SKIP_LAST_DEATHS", "5"),
        ]))
        .unwrap();
        assert_eq!(cfg.skip_last.get(Metric::NewCases), 2);
        assert_eq!(cfg.skip_last.get(Metric::InHospital), 2);
        assert_eq!(cfg.skip_last.get(Metric::Deaths), 5);
    }

    #[test]
    fn urls_interval_and_bind_override() {
        let cfg = Config::from_lookup(lookup(&[
            ("EPI_CASES_URL", "http://localhost/c.json"),
            ("EPI_REFRESH_SECS", "60"),
            ("EPI_BIND", "0.0.0.0:9000"),
            ("EPI_HTTP_TIMEOUT_SECS", " 5 "),
        ]))
        .unwrap();
        assert_eq!(cfg.urls.cases, "http://localhost/c.json");
        assert_eq!(cfg.urls.hospital, FeedUrls::default().hospital);
        assert_eq!(cfg.refresh_interval, Duration::from_secs(60));
        assert_eq!(cfg.http_timeout, Duration::from_secs(5));
        assert_eq!(cfg.bind, "0.0.0.0:9000");
    }

    #[test]
    fn invalid_numbers_are_config_errors() {
        let err = Config::from_lookup(lookup(&[("EPI_SKIP_LAST", "-1")])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("EPI_SKIP_LAST"));

        let err = Config::from_lookup(lookup(&[("EPI_REFRESH_SECS", "0")])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn blank_values_are_ignored() {
        let cfg = Config::from_lookup(lookup(&[("EPI_BIND", "  ")])).unwrap();
        assert_eq!(cfg.bind, DEFAULT_BIND);
    }
}
