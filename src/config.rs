//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Default upstream projections endpoint.
pub const DEFAULT_FEED_URL: &str =
    "https://partner-api.prizepicks.com/projections?per_page=1000&include=new_player,stat_average,league,team";

/// Default key of the single snapshot slot.
pub const DEFAULT_CACHE_KEY: &str = "PROPS_PROJECTION_CACHE";

/// Four hours, in seconds.
const FOUR_HOURS_SECS: u64 = 4 * 60 * 60;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Key of the single snapshot slot in the backend
    pub cache_key: String,
    /// Seconds after the last fetch before a whole snapshot is stale
    pub snapshot_ttl: u64,
    /// Seconds past start time a projection stays in the snapshot
    pub projection_retention: u64,
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
    /// Scheduled refresh interval in seconds (0 disables)
    pub refresh_interval: u64,
    /// Seconds within which a prior fetch is reused instead of refetching
    pub min_fetch_interval: u64,
    /// Compare-and-swap attempts before falling back to an unconditional write
    pub write_retries: u32,
    /// Directory for the file backend; in-memory backend when unset
    pub snapshot_dir: Option<PathBuf>,
    /// Upstream projections feed URL
    pub feed_url: String,
    /// Feed request timeout in seconds
    pub feed_timeout: u64,
    /// Feed fetch attempts
    pub feed_retries: u32,
    /// Base feed retry delay in milliseconds
    pub feed_retry_delay_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_KEY` - snapshot slot key (default: PROPS_PROJECTION_CACHE)
    /// - `SNAPSHOT_TTL` - snapshot staleness window in seconds (default: 14400)
    /// - `PROJECTION_RETENTION` - retention past start time in seconds (default: 14400)
    /// - `SWEEP_INTERVAL` - sweep frequency in seconds (default: 300)
    /// - `REFRESH_INTERVAL` - scheduled fetch frequency in seconds (default: 0, off)
    /// - `MIN_FETCH_INTERVAL` - fetch throttle in seconds (default: 60)
    /// - `WRITE_RETRIES` - compare-and-swap attempts (default: 3)
    /// - `SNAPSHOT_DIR` - file backend directory (default: unset, in-memory)
    /// - `FEED_URL`, `FEED_TIMEOUT`, `FEED_RETRIES`, `FEED_RETRY_DELAY_MS`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cache_key: env::var("CACHE_KEY")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.cache_key),
            snapshot_ttl: env_or("SNAPSHOT_TTL", defaults.snapshot_ttl),
            projection_retention: env_or("PROJECTION_RETENTION", defaults.projection_retention),
            sweep_interval: env_or("SWEEP_INTERVAL", defaults.sweep_interval),
            refresh_interval: env_or("REFRESH_INTERVAL", defaults.refresh_interval),
            min_fetch_interval: env_or("MIN_FETCH_INTERVAL", defaults.min_fetch_interval),
            write_retries: env_or("WRITE_RETRIES", defaults.write_retries),
            snapshot_dir: env::var("SNAPSHOT_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            feed_url: env::var("FEED_URL")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.feed_url),
            feed_timeout: env_or("FEED_TIMEOUT", defaults.feed_timeout),
            feed_retries: env_or("FEED_RETRIES", defaults.feed_retries),
            feed_retry_delay_ms: env_or("FEED_RETRY_DELAY_MS", defaults.feed_retry_delay_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            snapshot_ttl: FOUR_HOURS_SECS,
            projection_retention: FOUR_HOURS_SECS,
            sweep_interval: 300,
            refresh_interval: 0,
            min_fetch_interval: 60,
            write_retries: 3,
            snapshot_dir: None,
            feed_url: DEFAULT_FEED_URL.to_string(),
            feed_timeout: 30,
            feed_retries: 3,
            feed_retry_delay_ms: 1000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache_key, "PROPS_PROJECTION_CACHE");
        assert_eq!(config.snapshot_ttl, 14_400);
        assert_eq!(config.projection_retention, 14_400);
        assert_eq!(config.refresh_interval, 0);
        assert_eq!(config.min_fetch_interval, 60);
        assert!(config.snapshot_dir.is_none());
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        env::set_var("PARLAYER_TEST_GARBAGE_PORT", "not-a-number");
        assert_eq!(env_or("PARLAYER_TEST_GARBAGE_PORT", 42u16), 42);
        env::set_var("PARLAYER_TEST_GARBAGE_PORT", "8080");
        assert_eq!(env_or("PARLAYER_TEST_GARBAGE_PORT", 42u16), 8080);
        env::remove_var("PARLAYER_TEST_GARBAGE_PORT");
    }
}
