//! Newsroom pipeline configuration system.
//!
//! TOML-based configuration with environment variable override support,
//! following the same layered precedence used by the rest of this
//! workspace: built-in defaults, then a config file, then environment
//! variables, each layer overriding the last.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub scheduler: SchedulerConfig,
    pub standby: StandbyConfig,
    pub frontier: FrontierConfig,
    pub extract: ExtractConfig,
    pub router: RouterConfig,
    pub auth: AuthConfig,

    /// Local data directory (robots.txt cache spill, etc).
    pub data_dir: String,

    /// Enable development mode (relaxes auth, verbose logging defaults).
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
            redis: RedisConfig::default(),
            scheduler: SchedulerConfig::default(),
            standby: StandbyConfig::default(),
            frontier: FrontierConfig::default(),
            extract: ExtractConfig::default(),
            router: RouterConfig::default(),
            auth: AuthConfig::default(),
            data_dir: "./data".to_string(),
            dev_mode: false,
        }
    }
}

/// Admin API HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["http://localhost:4200".to_string()],
        }
    }
}

/// Postgres configuration. The durable tables are the single source of
/// truth for job state, frontier state, and cross-process coordination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/newsroom".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 10,
        }
    }
}

/// Redis configuration, used only for Layer 2 channel pub/sub delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: u32,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
        }
    }
}

/// Job scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Polling interval for due-job scans in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum jobs claimed per poll.
    pub batch_size: usize,
    /// Maximum jobs running concurrently on this instance.
    pub max_concurrent_jobs: usize,
    /// A running job with no heartbeat for this many minutes is
    /// considered abandoned and recovered.
    pub stale_threshold_minutes: i64,
    /// Initial retry backoff in seconds for a failed job.
    pub backoff_initial_secs: i64,
    /// Ceiling on exponential retry backoff in seconds.
    pub backoff_max_secs: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            batch_size: 50,
            max_concurrent_jobs: 20,
            stale_threshold_minutes: 15,
            backoff_initial_secs: 30,
            backoff_max_secs: 3600,
        }
    }
}

/// Leader election configuration. The lease is advisory only: leader
/// operations still use row-level CAS, the lease just avoids every
/// instance hammering the same claim query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StandbyConfig {
    pub enabled: bool,
    pub instance_id: String,
    pub lease_name: String,
    pub lease_ttl_secs: u64,
    pub refresh_interval_secs: u64,
}

impl Default for StandbyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            instance_id: String::new(),
            lease_name: "nc:scheduler:leader".to_string(),
            lease_ttl_secs: 30,
            refresh_interval_secs: 10,
        }
    }
}

/// Crawl frontier and fetcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontierConfig {
    /// Maximum frontier rows claimed per batch.
    pub claim_batch_size: usize,
    /// Maximum concurrent fetches per host (politeness cap).
    pub max_concurrent_fetches_per_host: usize,
    /// Minimum delay between requests to the same host, when robots.txt
    /// does not specify a crawl-delay.
    pub default_politeness_delay_ms: u64,
    /// How long a cached robots.txt is trusted before refetching.
    pub robots_cache_ttl_secs: u64,
    /// Per-request fetch timeout.
    pub fetch_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            claim_batch_size: 100,
            max_concurrent_fetches_per_host: 2,
            default_politeness_delay_ms: 1000,
            robots_cache_ttl_secs: 3600,
            fetch_timeout_ms: 15000,
            user_agent: "NewsroomPipelineBot/0.1 (+https://example.com/bot)".to_string(),
        }
    }
}

/// Content extraction and validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Bodies longer than this are truncated before storage.
    pub max_body_bytes: usize,
    /// Extracted articles with fewer body characters than this fail
    /// validation and are not forwarded to routing.
    pub min_body_chars: usize,
    /// URL of the classifier service's `/classify` endpoint. `None`
    /// disables classification (content stays `Pending` forever, useful
    /// for local dev without the ML service running).
    pub classifier_endpoint: Option<String>,
    pub classifier_timeout_ms: u64,
    /// Minimum `Article.quality_score` a router query may require
    /// (§9: "quality floor").
    pub default_min_quality_score: i16,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2_000_000,
            min_body_chars: 200,
            classifier_endpoint: None,
            classifier_timeout_ms: 10_000,
            default_min_quality_score: 0,
        }
    }
}

/// Publisher routing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub timeout_ms: u64,
    pub max_connections_per_host: usize,
    pub circuit_breaker_enabled: bool,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_reset_secs: u64,
    /// Prefix applied to every Layer 2 Redis channel name.
    pub redis_channel_prefix: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_connections_per_host: 50,
            circuit_breaker_enabled: true,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 30,
            redis_channel_prefix: "nc:channel:".to_string(),
        }
    }
}

/// Admin API authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token required on every admin API request, except health
    /// checks. Empty in dev mode disables auth entirely.
    pub admin_token: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_token: String::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides, searching
    /// the standard file locations first.
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Validate cross-field invariants that serde defaults can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::ValidationError(
                "database.url must not be empty".to_string(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::ValidationError(
                "database.min_connections must not exceed max_connections".to_string(),
            ));
        }
        if !self.dev_mode && self.auth.admin_token.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.admin_token must be set outside dev_mode".to_string(),
            ));
        }
        if self.scheduler.backoff_initial_secs > self.scheduler.backoff_max_secs {
            return Err(ConfigError::ValidationError(
                "scheduler.backoff_initial_secs must not exceed backoff_max_secs".to_string(),
            ));
        }
        Ok(())
    }

    /// An example TOML configuration, for `nc-api-server --print-config`.
    pub fn example_toml() -> String {
        r#"# Newsroom pipeline configuration
# Environment variables override these settings; see ConfigLoader.

[http]
port = 8080
host = "0.0.0.0"
cors_origins = ["http://localhost:4200"]

[database]
url = "postgres://localhost:5432/newsroom"
max_connections = 10
min_connections = 1

[redis]
url = "redis://localhost:6379"
pool_size = 10

[scheduler]
poll_interval_ms = 500
batch_size = 50
max_concurrent_jobs = 20
stale_threshold_minutes = 15
backoff_initial_secs = 30
backoff_max_secs = 3600

[standby]
enabled = false
instance_id = ""
lease_name = "nc:scheduler:leader"
lease_ttl_secs = 30
refresh_interval_secs = 10

[frontier]
claim_batch_size = 100
max_concurrent_fetches_per_host = 2
default_politeness_delay_ms = 1000
robots_cache_ttl_secs = 3600
fetch_timeout_ms = 15000
user_agent = "NewsroomPipelineBot/0.1 (+https://example.com/bot)"

[extract]
max_body_bytes = 2000000
min_body_chars = 200

[router]
timeout_ms = 30000
max_connections_per_host = 50
circuit_breaker_enabled = true
circuit_breaker_threshold = 5
circuit_breaker_reset_secs = 30
redis_channel_prefix = "nc:channel:"

[auth]
admin_token = ""

data_dir = "./data"
dev_mode = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_dev_invalid_without_token() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn dev_mode_allows_empty_admin_token() {
        let mut config = AppConfig::default();
        config.dev_mode = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_connection_bounds() {
        let mut config = AppConfig::default();
        config.dev_mode = true;
        config.database.min_connections = 20;
        config.database.max_connections = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn example_toml_round_trips() {
        let text = AppConfig::example_toml();
        let parsed: AppConfig = toml::from_str(&text).expect("example config must parse");
        assert_eq!(parsed.http.port, 8080);
        assert_eq!(parsed.database.max_connections, 10);
    }
}
