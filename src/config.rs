//! Configuration management for RouteX
//!
//! - TOML configuration file parsing
//! - `ROUTEX_*` environment variable overrides
//! - Configuration validation
//! - Default settings

use crate::error::{Result, RouteError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub dns_probe: DnsProbeSettings,

    #[serde(default)]
    pub renewal: RenewalSettings,

    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// Storage backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Storage backend type: "memory", "file", "redis"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// File storage configuration
    #[serde(default)]
    pub file: Option<FileStoreConfig>,

    /// Redis storage configuration
    #[serde(default)]
    pub redis: Option<RedisStoreConfig>,
}

/// File storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Directory path for Route/Certificate records
    #[serde(default = "default_store_path")]
    pub path: String,
}

/// Redis storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    /// Redis connection URL (supports `${VAR}` syntax)
    pub url: String,
}

/// DNS probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsProbeSettings {
    /// Timeout for a single CNAME/A/AAAA lookup, in milliseconds
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
}

/// Renewal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalSettings {
    /// How often the sweeper ticks, in seconds
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Renewal horizon: Routes with a Certificate expiring within this many
    /// days of now are eligible for the sweep. Policy constant (§4.1),
    /// overridable for tests and operators.
    #[serde(default = "default_renew_before_days")]
    pub renew_before_days: u32,

    /// Upper bound on concurrent in-flight renewals during a sweep.
    #[serde(default = "default_sweep_concurrency")]
    pub sweep_concurrency: usize,
}

/// Metrics settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Enable the Prometheus registry
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metric name prefix
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,
}

// Default values
fn default_true() -> bool {
    true
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

fn default_store_path() -> String {
    ".routex/store".to_string()
}

fn default_lookup_timeout_ms() -> u64 {
    2_000
}

fn default_check_interval() -> u64 {
    3600
}

fn default_renew_before_days() -> u32 {
    30
}

fn default_sweep_concurrency() -> usize {
    8
}

fn default_metrics_prefix() -> String {
    "routex".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            file: None,
            redis: None,
        }
    }
}

impl Default for DnsProbeSettings {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl Default for RenewalSettings {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            renew_before_days: default_renew_before_days(),
            sweep_concurrency: default_sweep_concurrency(),
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            prefix: default_metrics_prefix(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreSettings::default(),
            dns_probe: DnsProbeSettings::default(),
            renewal: RenewalSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RouteError::configuration(format!("failed to read config file: {e}")))?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| RouteError::configuration(format!("failed to parse TOML: {e}")))
    }

    /// Apply `ROUTEX_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(backend) = env::var("ROUTEX_STORE_BACKEND") {
            self.store.backend = backend;
        }

        if let Ok(path) = env::var("ROUTEX_STORE_FILE_PATH") {
            self.store.file = Some(FileStoreConfig {
                path: Self::expand_env_var(&path)?,
            });
        }

        if let Ok(url) = env::var("ROUTEX_STORE_REDIS_URL") {
            self.store.redis = Some(RedisStoreConfig {
                url: Self::expand_env_var(&url)?,
            });
        }

        if let Ok(ms) = env::var("ROUTEX_DNS_PROBE_TIMEOUT_MS")
            && let Ok(ms) = ms.parse::<u64>()
        {
            self.dns_probe.lookup_timeout_ms = ms;
        }

        if let Ok(interval) = env::var("ROUTEX_RENEWAL_CHECK_INTERVAL_SECS")
            && let Ok(secs) = interval.parse::<u64>()
        {
            self.renewal.check_interval_secs = secs;
        }

        if let Ok(days) = env::var("ROUTEX_RENEWAL_BEFORE_DAYS")
            && let Ok(d) = days.parse::<u32>()
        {
            self.renewal.renew_before_days = d;
        }

        if let Ok(concurrency) = env::var("ROUTEX_RENEWAL_SWEEP_CONCURRENCY")
            && let Ok(n) = concurrency.parse::<usize>()
        {
            self.renewal.sweep_concurrency = n;
        }

        if let Ok(enabled) = env::var("ROUTEX_METRICS_ENABLED") {
            self.metrics.enabled = enabled == "true" || enabled == "1";
        }

        Ok(())
    }

    /// Expand environment variables in format `${VAR}`
    pub fn expand_env_var(value: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|_| RouteError::configuration("invalid regex pattern"))?;

        let result = re
            .replace_all(value, |caps: &regex::Captures| {
                let var_name = &caps[1];
                env::var(var_name).unwrap_or_else(|_| format!("${{{var_name}}}"))
            })
            .to_string();

        Ok(result)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        match self.store.backend.as_str() {
            "memory" => {}
            "file" => {
                if self
                    .store
                    .file
                    .as_ref()
                    .is_none_or(|f| f.path.is_empty())
                {
                    return Err(RouteError::configuration("file store path cannot be empty"));
                }
            }
            "redis" => {
                if self
                    .store
                    .redis
                    .as_ref()
                    .is_none_or(|r| r.url.is_empty())
                {
                    return Err(RouteError::configuration("redis store URL cannot be empty"));
                }
            }
            backend => {
                return Err(RouteError::configuration(format!(
                    "invalid storage backend: {backend}"
                )));
            }
        }

        if self.renewal.check_interval_secs == 0 {
            return Err(RouteError::configuration("check interval must be greater than 0"));
        }

        if self.renewal.sweep_concurrency == 0 {
            return Err(RouteError::configuration("sweep concurrency must be greater than 0"));
        }

        Ok(())
    }

    /// Renewal check interval as a [`Duration`]
    pub fn renewal_check_interval(&self) -> Duration {
        Duration::from_secs(self.renewal.check_interval_secs)
    }

    /// Renewal horizon as a [`Duration`]
    pub fn renewal_horizon(&self) -> Duration {
        Duration::from_secs(u64::from(self.renewal.renew_before_days) * 24 * 3600)
    }

    /// DNS probe lookup timeout as a [`Duration`]
    pub fn dns_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_probe.lookup_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(test)]
    use temp_env;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.renewal.renew_before_days, 30);
    }

    #[test]
    fn test_config_from_string() {
        let toml = r#"
[store]
backend = "file"

[store.file]
path = "/var/lib/routex"

[renewal]
check_interval_secs = 1800
renew_before_days = 14
sweep_concurrency = 4
"#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.store.backend, "file");
        assert_eq!(config.store.file.unwrap().path, "/var/lib/routex");
        assert_eq!(config.renewal.check_interval_secs, 1800);
        assert_eq!(config.renewal.renew_before_days, 14);
        assert_eq!(config.renewal.sweep_concurrency, 4);
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let mut invalid_config = Config::default();
        invalid_config.store.backend = "file".to_string();
        invalid_config.store.file = None;
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_expand_env_var() {
        temp_env::with_var("TEST_VAR", Some("test_value"), || {
            let result = Config::expand_env_var("prefix_${TEST_VAR}_suffix").unwrap();
            assert_eq!(result, "prefix_test_value_suffix");
        });
    }

    #[test]
    fn test_env_overrides() {
        temp_env::with_vars(
            [
                ("ROUTEX_RENEWAL_CHECK_INTERVAL_SECS", Some("60")),
                ("ROUTEX_RENEWAL_BEFORE_DAYS", Some("7")),
            ],
            || {
                let mut config = Config::default();
                config.apply_env_overrides().unwrap();
                assert_eq!(config.renewal.check_interval_secs, 60);
                assert_eq!(config.renewal.renew_before_days, 7);
            },
        );
    }
}
