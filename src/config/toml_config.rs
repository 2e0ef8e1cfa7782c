use crate::config::AdapterConfig;
use crate::utils::error::{Result, StorageError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 設定檔格式：
///
/// ```toml
/// [storage]
/// mode = "hybrid"
/// api_base_url = "${KV_URL}"
///
/// [local]
/// data_file = "./data/store.json"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub storage: AdapterConfig,
    pub local: Option<LocalConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    pub data_file: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(StorageError::Io)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| StorageError::configuration(format!("TOML parsing error: {}", e)))
    }

    /// 替換環境變數 (例如 ${STORAGE_API_KEY})，未設定的變數視為設定錯誤
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| StorageError::configuration(format!("invalid pattern: {}", e)))?;

        let mut missing = Vec::new();
        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                missing.push(var_name.to_string());
                String::new()
            })
        });

        if !missing.is_empty() {
            return Err(StorageError::configuration(format!(
                "environment variable(s) not set: {}",
                missing.join(", ")
            )));
        }

        Ok(result.into_owned())
    }

    pub fn data_file(&self) -> Option<&str> {
        self.local.as_ref().and_then(|l| l.data_file.as_deref())
    }

    pub fn into_adapter_config(self) -> AdapterConfig {
        self.storage
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        if let Some(data_file) = self.data_file() {
            validation::validate_non_empty_string("local.data_file", data_file)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FailoverPolicy, StorageMode};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[storage]
mode = "hybrid"
api_base_url = "https://api.example.com/kv"
api_key = "secret"
key_prefix = "profiles:"
cache_expiry_ms = 60000
failover_mode = "none"

[local]
data_file = "./data/store.json"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.storage.mode, StorageMode::Hybrid);
        assert_eq!(config.storage.key_prefix, "profiles:");
        assert_eq!(config.storage.cache_expiry_ms, 60_000);
        assert_eq!(config.storage.timeout_ms, 5000);
        assert_eq!(config.storage.failover_mode, FailoverPolicy::None);
        assert_eq!(config.data_file(), Some("./data/store.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.storage, AdapterConfig::default());
        assert!(config.data_file().is_none());
    }

    #[test]
    fn test_unknown_mode_is_configuration_error() {
        let result = TomlConfig::from_toml_str("[storage]\nmode = \"cloud\"\n");
        assert!(matches!(result, Err(StorageError::Configuration { .. })));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_KV_BASE_URL", "https://test.kv.com");

        let toml_content = r#"
[storage]
mode = "server"
api_base_url = "${TEST_KV_BASE_URL}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.storage.api_base_url.as_deref(),
            Some("https://test.kv.com")
        );

        std::env::remove_var("TEST_KV_BASE_URL");
    }

    #[test]
    fn test_missing_env_var_fails() {
        let toml_content = r#"
[storage]
api_key = "${TEST_KV_DEFINITELY_UNSET}"
"#;
        assert!(matches!(
            TomlConfig::from_toml_str(toml_content),
            Err(StorageError::Configuration { .. })
        ));
    }

    #[test]
    fn test_config_validation() {
        let config =
            TomlConfig::from_toml_str("[storage]\nmode = \"hybrid\"\napi_base_url = \"invalid-url\"\n")
                .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[storage]\nkey_prefix = \"file-test:\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.storage.key_prefix, "file-test:");
    }
}
