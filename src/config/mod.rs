#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use crate::domain::model::{FailoverPolicy, StorageMode};

use crate::utils::error::{Result, StorageError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_KEY_PREFIX: &str = "storage_adapter:";
pub const DEFAULT_CACHE_EXPIRY_MS: u64 = 24 * 60 * 60 * 1000;
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// 儲存適配器的設定，每次操作開始時取一份快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub mode: StorageMode,
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
    pub key_prefix: String,
    pub cache_expiry_ms: u64,
    pub timeout_ms: u64,
    pub failover_mode: FailoverPolicy,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::Local,
            api_base_url: None,
            api_key: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            cache_expiry_ms: DEFAULT_CACHE_EXPIRY_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            failover_mode: FailoverPolicy::Local,
        }
    }
}

impl AdapterConfig {
    pub fn local() -> Self {
        Self::default()
    }

    pub fn remote(api_base_url: impl Into<String>) -> Self {
        Self {
            mode: StorageMode::Remote,
            api_base_url: Some(api_base_url.into()),
            ..Self::default()
        }
    }

    pub fn hybrid(api_base_url: impl Into<String>) -> Self {
        Self {
            mode: StorageMode::Hybrid,
            api_base_url: Some(api_base_url.into()),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    pub fn with_cache_expiry_ms(mut self, cache_expiry_ms: u64) -> Self {
        self.cache_expiry_ms = cache_expiry_ms;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_failover(mut self, failover_mode: FailoverPolicy) -> Self {
        self.failover_mode = failover_mode;
        self
    }

    /// 從環境變數載入，未設定的欄位使用預設值
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(mode) = env::var("STORAGE_MODE") {
            config.mode = mode.parse()?;
        }
        if let Ok(url) = env::var("STORAGE_API_BASE_URL") {
            config.api_base_url = Some(url);
        }
        if let Ok(key) = env::var("STORAGE_API_KEY") {
            config.api_key = Some(key);
        }
        if let Ok(prefix) = env::var("STORAGE_KEY_PREFIX") {
            config.key_prefix = prefix;
        }
        if let Ok(expiry) = env::var("STORAGE_CACHE_EXPIRY_MS") {
            config.cache_expiry_ms = parse_env_number("STORAGE_CACHE_EXPIRY_MS", &expiry)?;
        }
        if let Ok(timeout) = env::var("STORAGE_TIMEOUT_MS") {
            config.timeout_ms = parse_env_number("STORAGE_TIMEOUT_MS", &timeout)?;
        }
        if let Ok(failover) = env::var("STORAGE_FAILOVER_MODE") {
            config.failover_mode = failover.parse()?;
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    pub fn uses_remote(&self) -> bool {
        !matches!(self.mode, StorageMode::Local)
    }
}

fn parse_env_number(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| StorageError::InvalidConfigValue {
            field: name.to_string(),
            value: raw.to_string(),
            reason: "Value must be a non-negative integer".to_string(),
        })
}

impl Validate for AdapterConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("key_prefix", &self.key_prefix)?;
        validation::validate_positive_number("cache_expiry_ms", self.cache_expiry_ms, 1)?;
        validation::validate_positive_number("timeout_ms", self.timeout_ms, 1)?;

        // local 模式不需要遠端端點
        if self.uses_remote() {
            let url = validation::validate_required_field("api_base_url", &self.api_base_url)?;
            validation::validate_url("api_base_url", url)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::default();
        assert_eq!(config.mode, StorageMode::Local);
        assert_eq!(config.cache_expiry_ms, 86_400_000);
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.failover_mode, FailoverPolicy::Local);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_remote_requires_base_url() {
        let mut config = AdapterConfig::remote("https://api.example.com/kv");
        assert!(config.validate().is_ok());

        config.api_base_url = None;
        assert!(matches!(
            config.validate(),
            Err(StorageError::MissingConfig { .. })
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = AdapterConfig::local().with_timeout_ms(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_full_key() {
        let config = AdapterConfig::local().with_key_prefix("users:");
        assert_eq!(config.full_key("42"), "users:42");
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("STORAGE_MODE", "hybrid");
        std::env::set_var("STORAGE_API_BASE_URL", "https://kv.example.com");
        std::env::set_var("STORAGE_TIMEOUT_MS", "250");

        let config = AdapterConfig::from_env().unwrap();
        assert_eq!(config.mode, StorageMode::Hybrid);
        assert_eq!(config.api_base_url.as_deref(), Some("https://kv.example.com"));
        assert_eq!(config.timeout_ms, 250);

        std::env::set_var("STORAGE_TIMEOUT_MS", "soon");
        assert!(AdapterConfig::from_env().is_err());

        std::env::remove_var("STORAGE_MODE");
        std::env::remove_var("STORAGE_API_BASE_URL");
        std::env::remove_var("STORAGE_TIMEOUT_MS");
    }
}
