//! Configuration loader with file and environment variable support.

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths, checked in order.
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "newsroom.toml",
    "./config/config.toml",
    "/etc/newsroom/config.toml",
];

/// Configuration loader.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path.
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found), then apply environment
    /// variable overrides, then validate.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("NC_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        for path in CONFIG_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    fn apply_env_overrides(&self, config: &mut AppConfig) {
        // HTTP
        if let Ok(val) = env::var("NC_HTTP_PORT") {
            if let Ok(port) = val.parse() {
                config.http.port = port;
            }
        }
        if let Ok(val) = env::var("NC_HTTP_HOST") {
            config.http.host = val;
        }
        if let Ok(val) = env::var("NC_CORS_ORIGINS") {
            config.http.cors_origins = val.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Database
        if let Ok(val) = env::var("NC_DATABASE_URL") {
            config.database.url = val;
        }
        if let Ok(val) = env::var("NC_DATABASE_MAX_CONNECTIONS") {
            if let Ok(n) = val.parse() {
                config.database.max_connections = n;
            }
        }
        if let Ok(val) = env::var("NC_DATABASE_MIN_CONNECTIONS") {
            if let Ok(n) = val.parse() {
                config.database.min_connections = n;
            }
        }

        // Redis
        if let Ok(val) = env::var("NC_REDIS_URL") {
            config.redis.url = val;
        }
        if let Ok(val) = env::var("NC_REDIS_POOL_SIZE") {
            if let Ok(n) = val.parse() {
                config.redis.pool_size = n;
            }
        }

        // Scheduler
        if let Ok(val) = env::var("NC_SCHEDULER_POLL_INTERVAL_MS") {
            if let Ok(n) = val.parse() {
                config.scheduler.poll_interval_ms = n;
            }
        }
        if let Ok(val) = env::var("NC_SCHEDULER_BATCH_SIZE") {
            if let Ok(n) = val.parse() {
                config.scheduler.batch_size = n;
            }
        }
        if let Ok(val) = env::var("NC_SCHEDULER_MAX_CONCURRENT_JOBS") {
            if let Ok(n) = val.parse() {
                config.scheduler.max_concurrent_jobs = n;
            }
        }
        if let Ok(val) = env::var("NC_SCHEDULER_STALE_THRESHOLD_MINUTES") {
            if let Ok(n) = val.parse() {
                config.scheduler.stale_threshold_minutes = n;
            }
        }

        // Standby / leader election
        if let Ok(val) = env::var("NC_STANDBY_ENABLED") {
            config.standby.enabled = val.parse().unwrap_or(false);
        }
        if let Ok(val) = env::var("NC_STANDBY_INSTANCE_ID") {
            config.standby.instance_id = val;
        }
        if let Ok(val) = env::var("NC_STANDBY_LEASE_TTL_SECS") {
            if let Ok(n) = val.parse() {
                config.standby.lease_ttl_secs = n;
            }
        }

        // Frontier / fetcher
        if let Ok(val) = env::var("NC_FRONTIER_CLAIM_BATCH_SIZE") {
            if let Ok(n) = val.parse() {
                config.frontier.claim_batch_size = n;
            }
        }
        if let Ok(val) = env::var("NC_FRONTIER_USER_AGENT") {
            config.frontier.user_agent = val;
        }
        if let Ok(val) = env::var("NC_FRONTIER_DEFAULT_POLITENESS_DELAY_MS") {
            if let Ok(n) = val.parse() {
                config.frontier.default_politeness_delay_ms = n;
            }
        }

        // Extract
        if let Ok(val) = env::var("NC_EXTRACT_MIN_BODY_CHARS") {
            if let Ok(n) = val.parse() {
                config.extract.min_body_chars = n;
            }
        }

        // Router
        if let Ok(val) = env::var("NC_ROUTER_TIMEOUT_MS") {
            if let Ok(n) = val.parse() {
                config.router.timeout_ms = n;
            }
        }
        if let Ok(val) = env::var("NC_ROUTER_CIRCUIT_BREAKER_ENABLED") {
            config.router.circuit_breaker_enabled = val.parse().unwrap_or(true);
        }
        if let Ok(val) = env::var("NC_ROUTER_REDIS_CHANNEL_PREFIX") {
            config.router.redis_channel_prefix = val;
        }

        // Auth
        if let Ok(val) = env::var("NC_AUTH_ADMIN_TOKEN") {
            config.auth.admin_token = val;
        }

        // General
        if let Ok(val) = env::var("NC_DATA_DIR") {
            config.data_dir = val;
        }
        if let Ok(val) = env::var("NC_DEV_MODE") {
            config.dev_mode = val.parse().unwrap_or(false);
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_explicit_path_over_search_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my-config.toml");
        std::fs::write(&path, AppConfig::example_toml()).unwrap();

        let loader = ConfigLoader::with_path(&path);
        let found = loader.find_config_file();
        assert_eq!(found, Some(path));
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let loader = ConfigLoader::with_path("/nonexistent/path/config.toml");
        assert!(loader.find_config_file().is_none());
    }
}
