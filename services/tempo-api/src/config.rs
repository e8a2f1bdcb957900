//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use earthdata::{CmrConfig, EarthdataCredentials};
use tempo_common::product::DEFAULT_VERSION;
use tempo_pipeline::PipelineConfig;

/// Response cache backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackend {
    /// Shared Redis instance; caching is disabled if it is unreachable.
    Redis,
    /// In-process LRU cache.
    Memory,
    /// No caching.
    None,
}

/// TEMPO API Server
#[derive(Parser, Debug, Clone)]
#[command(name = "tempo-api")]
#[command(about = "TEMPO satellite trace-gas column API")]
pub struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:5000", env = "TEMPO_LISTEN_ADDR")]
    pub listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Number of worker threads
    #[arg(long, env = "TEMPO_WORKER_THREADS")]
    pub worker_threads: Option<usize>,

    /// Response cache backend
    #[arg(long, value_enum, default_value = "redis", env = "TEMPO_CACHE_BACKEND")]
    pub cache_backend: CacheBackend,

    /// Full Redis URL; overrides --redis-host/--redis-port
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    #[arg(long, default_value = "localhost", env = "REDIS_HOST")]
    pub redis_host: String,

    #[arg(long, default_value_t = 6379, env = "REDIS_PORT")]
    pub redis_port: u16,

    /// Capacity of the in-process cache
    #[arg(long, default_value_t = 1024, env = "TEMPO_MEMORY_CACHE_ENTRIES")]
    pub memory_cache_entries: usize,

    /// Cached response lifetime in seconds
    #[arg(long, default_value_t = 3600, env = "CACHE_EXPIRY")]
    pub cache_expiry: u64,

    /// Search radius for current-map requests (km)
    #[arg(long, default_value_t = 50.0, env = "TEMPO_CURRENT_RADIUS_KM")]
    pub current_radius_km: f64,

    /// Search radius for data-range requests (km)
    #[arg(long, default_value_t = 10.0, env = "TEMPO_RANGE_RADIUS_KM")]
    pub range_radius_km: f64,

    /// Granules requested per product search
    #[arg(long, default_value_t = 10, env = "TEMPO_MAX_GRANULES")]
    pub max_granules: usize,

    /// Catalog collection version
    #[arg(long, default_value = DEFAULT_VERSION, env = "TEMPO_PRODUCT_VERSION")]
    pub product_version: String,

    /// CMR search endpoint
    #[arg(long, default_value = earthdata::cmr::DEFAULT_CMR_URL, env = "CMR_SEARCH_URL")]
    pub cmr_url: String,

    /// Earthdata Login endpoint
    #[arg(long, default_value = earthdata::auth::DEFAULT_URS_URL, env = "EARTHDATA_URS_URL")]
    pub urs_url: String,

    /// Directory for downloaded granules
    #[arg(long, env = "TEMPO_SPOOL_DIR")]
    pub spool_dir: Option<PathBuf>,

    #[arg(long, env = "EARTHDATA_TOKEN", hide_env_values = true)]
    pub earthdata_token: Option<String>,

    #[arg(long, env = "EARTHDATA_USERNAME")]
    pub earthdata_username: Option<String>,

    #[arg(long, env = "EARTHDATA_PASSWORD", hide_env_values = true)]
    pub earthdata_password: Option<String>,
}

impl Args {
    pub fn redis_url(&self) -> String {
        match &self.redis_url {
            Some(url) => url.clone(),
            None => format!("redis://{}:{}/0", self.redis_host, self.redis_port),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_expiry)
    }

    /// A token wins over username/password.
    pub fn credentials(&self) -> Option<EarthdataCredentials> {
        if let Some(token) = self.earthdata_token.as_ref().filter(|t| !t.is_empty()) {
            return Some(EarthdataCredentials::Token(token.clone()));
        }
        match (&self.earthdata_username, &self.earthdata_password) {
            (Some(username), Some(password)) => Some(EarthdataCredentials::Login {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            current_radius_km: self.current_radius_km,
            range_radius_km: self.range_radius_km,
            max_granules: self.max_granules,
            product_version: self.product_version.clone(),
            cache_ttl: self.cache_ttl(),
            ..PipelineConfig::default()
        }
    }

    pub fn cmr_config(&self) -> CmrConfig {
        let defaults = CmrConfig::default();
        CmrConfig {
            search_url: self.cmr_url.clone(),
            urs_url: self.urs_url.clone(),
            spool_dir: self.spool_dir.clone().unwrap_or(defaults.spool_dir),
            spool_max_age: self.cache_ttl(),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("tempo-api").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_redis_url_from_host_and_port() {
        let mut args = parse(&["--redis-host", "cache", "--redis-port", "6380"]);
        // REDIS_URL from the environment would take precedence.
        args.redis_url = None;
        assert_eq!(args.redis_url(), "redis://cache:6380/0");
    }

    #[test]
    fn test_explicit_redis_url_wins() {
        let args = parse(&["--redis-url", "redis://elsewhere:1/2"]);
        assert_eq!(args.redis_url(), "redis://elsewhere:1/2");
    }

    #[test]
    fn test_token_preferred_over_login() {
        let args = parse(&[
            "--earthdata-token",
            "tok",
            "--earthdata-username",
            "u",
            "--earthdata-password",
            "p",
        ]);
        assert!(matches!(args.credentials(), Some(EarthdataCredentials::Token(t)) if t == "tok"));
    }

    #[test]
    fn test_pipeline_config_from_flags() {
        let args = parse(&[
            "--current-radius-km",
            "25",
            "--range-radius-km",
            "5",
            "--max-granules",
            "3",
            "--cache-expiry",
            "60",
        ]);
        let config = args.pipeline_config();
        assert_eq!(config.current_radius_km, 25.0);
        assert_eq!(config.range_radius_km, 5.0);
        assert_eq!(config.max_granules, 3);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(args.cmr_config().spool_max_age, Duration::from_secs(60));
    }

    #[test]
    fn test_cache_backend_values() {
        assert_eq!(parse(&["--cache-backend", "memory"]).cache_backend, CacheBackend::Memory);
        assert_eq!(parse(&["--cache-backend", "none"]).cache_backend, CacheBackend::None);
    }
}
