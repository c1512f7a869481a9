use std::env;
use std::time::Duration;

use crate::stats::EngineConfig;
use crate::stats::window::RangeSelector;

pub struct Config {
    pub port: u16,
    pub support_api_url: String,
    pub support_api_token: Option<String>,
    pub deposits_api_url: String,
    pub engine: EngineConfig,
    pub default_range: RangeSelector,
    pub snapshot_refresh: Duration,
    pub stats_refresh: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let support_api_url =
            env::var("SUPPORT_API_URL").unwrap_or_else(|_| "http://localhost:8080".into());
        let deposits_api_url =
            env::var("DEPOSITS_API_URL").unwrap_or_else(|_| support_api_url.clone());
        let support_api_token = env::var("SUPPORT_API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            workers: parse_or("STATS_WORKERS", defaults.workers).max(1),
            max_candidates: parse_or("STATS_MAX_CANDIDATES", defaults.max_candidates),
            request_timeout: Duration::from_secs(parse_or(
                "STATS_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
        };

        Self {
            port: parse_or("API_PORT", 3001),
            support_api_url: trim_base(support_api_url),
            support_api_token,
            deposits_api_url: trim_base(deposits_api_url),
            engine,
            default_range: env::var("STATS_DEFAULT_RANGE")
                .ok()
                .and_then(|r| RangeSelector::parse(&r))
                .unwrap_or_default(),
            snapshot_refresh: Duration::from_secs(parse_or("SNAPSHOT_REFRESH_SECS", 10u64).max(1)),
            stats_refresh: Duration::from_secs(parse_or("STATS_REFRESH_SECS", 30u64).max(1)),
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
