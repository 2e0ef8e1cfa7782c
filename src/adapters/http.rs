use crate::domain::ports::{HttpMethod, RemoteRequest, RemoteResponse, RemoteTransport};
use crate::utils::error::{Result, StorageError};
use async_trait::async_trait;
use reqwest::Client;

/// reqwest 實作的遠端呼叫
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn request(&self, request: RemoteRequest) -> Result<RemoteResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!("{} {}", request.method, request.url);
        let response = builder
            .send()
            .await
            .map_err(|e| StorageError::connectivity(describe_reqwest_error(&e)))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| StorageError::connectivity(describe_reqwest_error(&e)))?;

        tracing::debug!("Remote response status: {} ({} bytes)", status, text.len());

        // 很多伺服器對 PUT/DELETE 回 "OK" 之類的純文字，不是 JSON 就保留原字串
        let body = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
        };

        Ok(RemoteResponse { status, body })
    }
}

fn describe_reqwest_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {}", error)
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}
