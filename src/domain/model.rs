use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::StorageError;

/// 後端路由模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    Local,
    #[serde(rename = "server", alias = "remote")]
    Remote,
    Hybrid,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageMode::Local => "local",
            StorageMode::Remote => "server",
            StorageMode::Hybrid => "hybrid",
        };
        f.write_str(name)
    }
}

impl FromStr for StorageMode {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(StorageMode::Local),
            "server" | "remote" => Ok(StorageMode::Remote),
            "hybrid" => Ok(StorageMode::Hybrid),
            other => Err(StorageError::configuration(format!(
                "unknown storage mode '{}' (expected local, server or hybrid)",
                other
            ))),
        }
    }
}

/// 遠端失敗時是否退回本地
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailoverPolicy {
    #[default]
    Local,
    None,
}

impl fmt::Display for FailoverPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailoverPolicy::Local => f.write_str("local"),
            FailoverPolicy::None => f.write_str("none"),
        }
    }
}

impl FromStr for FailoverPolicy {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(FailoverPolicy::Local),
            "none" => Ok(FailoverPolicy::None),
            other => Err(StorageError::configuration(format!(
                "unknown failover mode '{}' (expected local or none)",
                other
            ))),
        }
    }
}

/// The on-disk shape of a locally stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub value: serde_json::Value,
    /// Unix epoch milliseconds.
    pub written_at: i64,
}

impl StoredRecord {
    pub fn new(value: serde_json::Value, written_at: i64) -> Self {
        Self { value, written_at }
    }

    pub fn is_fresh(&self, now_ms: i64, ttl_ms: u64) -> bool {
        is_fresh(self.written_at, now_ms, ttl_ms)
    }

    pub fn into_cache_entry(self, now_ms: i64, ttl_ms: u64) -> CacheEntry {
        let is_fresh = self.is_fresh(now_ms, ttl_ms);
        CacheEntry {
            value: self.value,
            written_at: self.written_at,
            is_fresh,
        }
    }
}

/// A record read back from the local store with freshness computed at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub written_at: i64,
    pub is_fresh: bool,
}

/// `now - written_at < ttl`. Records stamped in the future count as fresh.
pub fn is_fresh(written_at: i64, now_ms: i64, ttl_ms: u64) -> bool {
    let age = now_ms.saturating_sub(written_at);
    age < 0 || (age as u64) < ttl_ms
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStats {
    pub key: String,
    pub size_bytes: usize,
    pub written_at: Option<DateTime<Utc>>,
    pub is_fresh: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    pub mode: StorageMode,
    pub total_items: usize,
    pub total_size: usize,
    pub items: Vec<ItemStats>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_freshness_boundary() {
        let record = StoredRecord::new(json!("v"), 10_000);
        assert!(record.is_fresh(10_999, 1000));
        assert!(!record.is_fresh(11_000, 1000));
        assert!(!record.is_fresh(11_001, 1000));
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        assert!(is_fresh(5_000, 1_000, 10));
    }

    #[test]
    fn test_record_serialization_shape() {
        let record = StoredRecord::new(json!({"name": "A"}), 42);
        let raw = serde_json::to_value(&record).unwrap();
        assert_eq!(raw, json!({"value": {"name": "A"}, "written_at": 42}));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("local".parse::<StorageMode>().unwrap(), StorageMode::Local);
        assert_eq!("server".parse::<StorageMode>().unwrap(), StorageMode::Remote);
        assert_eq!("Remote".parse::<StorageMode>().unwrap(), StorageMode::Remote);
        assert_eq!("hybrid".parse::<StorageMode>().unwrap(), StorageMode::Hybrid);
        assert!(matches!(
            "cloud".parse::<StorageMode>(),
            Err(StorageError::Configuration { .. })
        ));
        assert_eq!(StorageMode::Remote.to_string(), "server");
    }

    #[test]
    fn test_failover_parsing() {
        assert_eq!("none".parse::<FailoverPolicy>().unwrap(), FailoverPolicy::None);
        assert!("retry".parse::<FailoverPolicy>().is_err());
    }
}
