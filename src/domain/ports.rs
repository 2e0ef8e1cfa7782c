use crate::utils::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// 本地持久化存儲（key 已含 prefix）
///
/// Implementations only need per-key read-after-write visibility.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn read_raw(&self, full_key: &str) -> Result<Option<String>>;
    async fn write_raw(&self, full_key: &str, raw: &str) -> Result<()>;
    /// Removing an absent key is not an error.
    async fn delete_raw(&self, full_key: &str) -> Result<()>;
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Put => f.write_str("PUT"),
            HttpMethod::Delete => f.write_str("DELETE"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: Option<serde_json::Value>,
}

impl RemoteResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 遠端呼叫能力。網路錯誤或逾時必須回傳 `Err`，HTTP 狀態碼則放在 `RemoteResponse`。
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    async fn request(&self, request: RemoteRequest) -> Result<RemoteResponse>;
}

pub trait Clock: Send + Sync {
    /// Current time in Unix epoch milliseconds.
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
