use crate::config::{AdapterConfig, FailoverPolicy, StorageMode};
use crate::core::merge::shallow_merge;
use crate::domain::model::{CacheEntry, ItemStats, StorageStats, StoredRecord};
use crate::domain::ports::{
    Clock, HttpMethod, LocalStore, RemoteRequest, RemoteResponse, RemoteTransport, SystemClock,
};
use crate::utils::error::{Result, StorageError};
use crate::utils::validation::Validate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use url::Url;

/// 統一的 key-value 存取層，依 `mode` 把操作導向本地、遠端或兩者。
///
/// Each operation takes one snapshot of the configuration when it starts, so
/// [`StorageAdapter::reconfigure`] never affects an operation already in flight.
/// No lock is held across a local or remote call.
pub struct StorageAdapter<L: LocalStore, R: RemoteTransport> {
    local: L,
    remote: R,
    clock: Arc<dyn Clock>,
    config: RwLock<Arc<AdapterConfig>>,
}

impl<L: LocalStore, R: RemoteTransport> StorageAdapter<L, R> {
    pub fn new(local: L, remote: R, config: AdapterConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            local,
            remote,
            clock: Arc::new(SystemClock),
            config: RwLock::new(Arc::new(config)),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> Arc<AdapterConfig> {
        match self.config.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// 整份替換設定；驗證失敗時保留舊設定
    pub fn reconfigure(&self, config: AdapterConfig) -> Result<()> {
        config.validate()?;

        let mut guard = match self.config.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tracing::debug!("Reconfiguring storage adapter: mode {} -> {}", guard.mode, config.mode);
        *guard = Arc::new(config);
        Ok(())
    }

    pub fn local_store(&self) -> &L {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Reads `key` according to the configured mode.
    ///
    /// The remote store cannot distinguish a stored JSON `null` from absence:
    /// a 2xx reply with a `null` or empty body is reported as `None`.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let config = self.config();
        if config.uses_remote() {
            check_remote_key(key)?;
        }

        match config.mode {
            StorageMode::Local => Ok(self.read_local(&config, key).await.map(|r| r.value)),
            StorageMode::Remote => match self.remote_get(&config, key).await {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.is_not_found() => Ok(None),
                Err(e) if config.failover_mode == FailoverPolicy::Local => {
                    tracing::warn!("Remote get for '{}' failed ({}), reading local store", key, e);
                    Ok(self.read_local(&config, key).await.map(|r| r.value))
                }
                Err(e) => Err(e),
            },
            StorageMode::Hybrid => self.hybrid_get(&config, key).await,
        }
    }

    async fn hybrid_get(&self, config: &AdapterConfig, key: &str) -> Result<Option<Value>> {
        let cached = self.read_entry(config, key).await;

        if let Some(entry) = &cached {
            if entry.is_fresh {
                tracing::debug!("Cache hit for '{}'", key);
                return Ok(Some(entry.value.clone()));
            }
            tracing::debug!("Cached value for '{}' is stale, refreshing", key);
        }

        match self.remote_get(config, key).await {
            Ok(value) => {
                if !self.write_local(config, key, &value).await {
                    tracing::warn!("Could not refresh local copy of '{}'", key);
                }
                Ok(Some(value))
            }
            // 本地的舊資料可能是遠端從未收到的寫入，優先於遠端的 404
            Err(e) => match cached {
                Some(entry) => {
                    tracing::warn!("Remote get for '{}' failed ({}), serving local copy", key, e);
                    Ok(Some(entry.value))
                }
                None if e.is_not_found() => Ok(None),
                None => Err(e),
            },
        }
    }

    /// Writes `value` under `key`. Storing `Value::Null` remotely reads back as `None`.
    pub async fn set(&self, key: &str, value: Value) -> Result<bool> {
        let config = self.config();
        if config.uses_remote() {
            check_remote_key(key)?;
        }

        match config.mode {
            StorageMode::Local => Ok(self.write_local(&config, key, &value).await),
            StorageMode::Remote => match self.remote_put(&config, key, &value).await {
                Ok(()) => Ok(true),
                Err(e) if config.failover_mode == FailoverPolicy::Local => {
                    tracing::warn!("Remote set for '{}' failed ({}), writing local store", key, e);
                    Ok(self.write_local(&config, key, &value).await)
                }
                Err(e) => Err(e),
            },
            StorageMode::Hybrid => {
                let local_ok = self.write_local(&config, key, &value).await;
                // 遠端失敗不影響結果，本地副本在下次成功同步前是權威版本
                let remote_ok = match self.remote_put(&config, key, &value).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!("Remote set for '{}' failed, keeping local copy: {}", key, e);
                        false
                    }
                };
                Ok(local_ok || remote_ok)
            }
        }
    }

    /// Shallow-merges `partial` over the current value and stores the result.
    ///
    /// The read and the write are two separate steps: concurrent updates of
    /// the same key race and the last write wins. Callers that need atomic
    /// updates must serialize them.
    pub async fn update(&self, key: &str, partial: Value) -> Result<bool> {
        let current = self
            .get(key)
            .await?
            .ok_or_else(|| StorageError::not_found(key))?;

        let merged = shallow_merge(current, partial);
        self.set(key, merged).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        let config = self.config();
        if config.uses_remote() {
            check_remote_key(key)?;
        }

        match config.mode {
            StorageMode::Local => Ok(self.delete_local(&config, key).await),
            StorageMode::Remote => match self.remote_delete(&config, key).await {
                Ok(()) => Ok(true),
                Err(e) if config.failover_mode == FailoverPolicy::Local => {
                    tracing::warn!("Remote delete for '{}' failed ({}), deleting locally", key, e);
                    Ok(self.delete_local(&config, key).await)
                }
                Err(e) => Err(e),
            },
            StorageMode::Hybrid => {
                let local_ok = self.delete_local(&config, key).await;
                if let Err(e) = self.remote_delete(&config, key).await {
                    tracing::warn!("Remote delete for '{}' failed, local copy removed: {}", key, e);
                }
                Ok(local_ok)
            }
        }
    }

    /// 本地存儲的統計，不會呼叫遠端
    pub async fn stats(&self) -> StorageStats {
        let config = self.config();
        let now = self.clock.now_ms();

        let mut keys = match self.local.list_keys(&config.key_prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Could not list local keys: {}", e);
                Vec::new()
            }
        };
        keys.sort();

        let mut items = Vec::with_capacity(keys.len());
        for full_key in keys {
            let raw = match self.local.read_raw(&full_key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Could not read '{}' for stats: {}", full_key, e);
                    continue;
                }
            };

            let record = serde_json::from_str::<StoredRecord>(&raw).ok();
            let key = full_key
                .strip_prefix(config.key_prefix.as_str())
                .unwrap_or(&full_key)
                .to_string();

            items.push(ItemStats {
                key,
                size_bytes: raw.len(),
                written_at: record
                    .as_ref()
                    .and_then(|r| chrono::DateTime::from_timestamp_millis(r.written_at)),
                is_fresh: record
                    .as_ref()
                    .is_some_and(|r| r.is_fresh(now, config.cache_expiry_ms)),
            });
        }

        StorageStats {
            mode: config.mode,
            total_items: items.len(),
            total_size: items.iter().map(|i| i.size_bytes).sum(),
            items,
        }
    }

    /// Local record for `key` with freshness computed now. Never contacts the remote store.
    pub async fn peek_local(&self, key: &str) -> Option<CacheEntry> {
        let config = self.config();
        self.read_entry(&config, key).await
    }

    /// Removes every local entry under the configured prefix and returns how many were removed.
    pub async fn clear_local(&self) -> usize {
        let config = self.config();

        let keys = match self.local.list_keys(&config.key_prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Could not list local keys: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for full_key in keys {
            match self.local.delete_raw(&full_key).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Could not delete '{}': {}", full_key, e),
            }
        }

        tracing::debug!("Cleared {} local entries under '{}'", removed, config.key_prefix);
        removed
    }

    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn set_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<bool> {
        let value = serde_json::to_value(value)?;
        self.set(key, value).await
    }

    // ---- local ----

    async fn read_local(&self, config: &AdapterConfig, key: &str) -> Option<StoredRecord> {
        let full_key = config.full_key(key);

        let raw = match self.local.read_raw(&full_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Local read for '{}' failed: {}", full_key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Ignoring unreadable local record '{}': {}", full_key, e);
                None
            }
        }
    }

    async fn read_entry(&self, config: &AdapterConfig, key: &str) -> Option<CacheEntry> {
        let record = self.read_local(config, key).await?;
        Some(record.into_cache_entry(self.clock.now_ms(), config.cache_expiry_ms))
    }

    async fn write_local(&self, config: &AdapterConfig, key: &str, value: &Value) -> bool {
        let full_key = config.full_key(key);
        let record = StoredRecord::new(value.clone(), self.clock.now_ms());

        let raw = match serde_json::to_string(&record) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Could not serialize record '{}': {}", full_key, e);
                return false;
            }
        };

        match self.local.write_raw(&full_key, &raw).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Local write for '{}' failed: {}", full_key, e);
                false
            }
        }
    }

    async fn delete_local(&self, config: &AdapterConfig, key: &str) -> bool {
        let full_key = config.full_key(key);

        match self.local.delete_raw(&full_key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Local delete for '{}' failed: {}", full_key, e);
                false
            }
        }
    }

    // ---- remote ----

    async fn remote_get(&self, config: &AdapterConfig, key: &str) -> Result<Value> {
        let response = self.send(config, HttpMethod::Get, key, None).await?;
        match response.body {
            Some(Value::Null) | None => Err(StorageError::not_found(key)),
            Some(value) => Ok(value),
        }
    }

    async fn remote_put(&self, config: &AdapterConfig, key: &str, value: &Value) -> Result<()> {
        self.send(config, HttpMethod::Put, key, Some(value.clone()))
            .await
            .map(|_| ())
    }

    async fn remote_delete(&self, config: &AdapterConfig, key: &str) -> Result<()> {
        match self.send(config, HttpMethod::Delete, key, None).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn send(
        &self,
        config: &AdapterConfig,
        method: HttpMethod,
        key: &str,
        body: Option<Value>,
    ) -> Result<RemoteResponse> {
        let request = RemoteRequest {
            method,
            url: remote_url(config, key)?,
            body,
            headers: request_headers(config),
            timeout: config.timeout(),
        };

        tracing::debug!("Remote {} for '{}'", method, key);
        let response = tokio::time::timeout(config.timeout(), self.remote.request(request))
            .await
            .map_err(|_| {
                StorageError::connectivity(format!(
                    "{} '{}' timed out after {} ms",
                    method, key, config.timeout_ms
                ))
            })??;

        if response.is_success() {
            return Ok(response);
        }

        match response.status {
            401 | 403 => Err(StorageError::Auth {
                status: response.status,
            }),
            404 => Err(StorageError::not_found(key)),
            status => Err(StorageError::connectivity(format!(
                "remote responded with status {}",
                status
            ))),
        }
    }
}

/// `api_base_url` 後面加上一個 percent-encoded 的 key 路徑段
fn remote_url(config: &AdapterConfig, key: &str) -> Result<String> {
    check_remote_key(key)?;

    let base = config
        .api_base_url
        .as_deref()
        .ok_or_else(|| StorageError::MissingConfig {
            field: "api_base_url".to_string(),
        })?;

    let mut url = Url::parse(base).map_err(|e| {
        StorageError::configuration(format!("invalid api_base_url '{}': {}", base, e))
    })?;

    url.path_segments_mut()
        .map_err(|_| StorageError::configuration(format!("api_base_url '{}' cannot be a base", base)))?
        .pop_if_empty()
        .push(key);

    Ok(url.to_string())
}

/// `""`、`.`、`..` 會被 URL 正規化成集合本身的路徑，不能當遠端 key
fn check_remote_key(key: &str) -> Result<()> {
    if matches!(key, "" | "." | "..") {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
            reason: "empty and dot-only keys cannot address a remote record".to_string(),
        });
    }
    Ok(())
}

fn request_headers(config: &AdapterConfig) -> Vec<(String, String)> {
    let mut headers = vec![("Accept".to_string(), "application/json".to_string())];

    if let Some(api_key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
        headers.push(("Authorization".to_string(), format!("Bearer {}", api_key)));
    }

    headers
}
