use crate::config::toml_config::TomlConfig;
use crate::config::AdapterConfig;
use crate::core::StorageAdapter;
use crate::domain::ports::{LocalStore, RemoteTransport};
use crate::utils::error::{ErrorKind, Result, StorageError};
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

pub const DEFAULT_DATA_FILE: &str = "./storage-data/store.json";

#[derive(Debug, Clone, Parser)]
#[command(name = "storage-adapter")]
#[command(about = "Read and write records through a local, remote or hybrid key-value store")]
pub struct Cli {
    #[arg(long, help = "TOML config file; STORAGE_* environment variables are used otherwise")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "local, server or hybrid")]
    pub mode: Option<String>,

    #[arg(long)]
    pub api_base_url: Option<String>,

    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub key_prefix: Option<String>,

    #[arg(long)]
    pub cache_expiry_ms: Option<u64>,

    #[arg(long)]
    pub timeout_ms: Option<u64>,

    #[arg(long, help = "local or none")]
    pub failover_mode: Option<String>,

    #[arg(long, help = "JSON file backing the local store")]
    pub data_file: Option<String>,

    #[arg(long, short, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the value stored under KEY (null when absent)
    Get { key: String },
    /// Store VALUE (JSON, or a plain string) under KEY
    Set { key: String, value: String },
    /// Shallow-merge VALUE into the value stored under KEY
    Update { key: String, value: String },
    /// Remove KEY
    Delete { key: String },
    /// Summarize the local store
    Stats,
    /// Remove every local entry under the key prefix
    Clear,
}

#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub adapter: AdapterConfig,
    pub data_file: String,
}

impl Cli {
    /// 設定來源優先順序：命令列 > 設定檔 > 環境變數 > 預設值
    pub fn resolve(&self) -> Result<ResolvedSettings> {
        let (mut adapter, file_data) = match &self.config {
            Some(path) => {
                let file = TomlConfig::from_file(path)?;
                let data_file = file.data_file().map(str::to_string);
                (file.into_adapter_config(), data_file)
            }
            None => (AdapterConfig::from_env()?, None),
        };

        if let Some(mode) = &self.mode {
            adapter.mode = mode.parse()?;
        }
        if let Some(url) = &self.api_base_url {
            adapter.api_base_url = Some(url.clone());
        }
        if let Some(key) = &self.api_key {
            adapter.api_key = Some(key.clone());
        }
        if let Some(prefix) = &self.key_prefix {
            adapter.key_prefix = prefix.clone();
        }
        if let Some(expiry) = self.cache_expiry_ms {
            adapter.cache_expiry_ms = expiry;
        }
        if let Some(timeout) = self.timeout_ms {
            adapter.timeout_ms = timeout;
        }
        if let Some(failover) = &self.failover_mode {
            adapter.failover_mode = failover.parse()?;
        }

        adapter.validate()?;

        let data_file = self
            .data_file
            .clone()
            .or(file_data)
            .unwrap_or_else(|| DEFAULT_DATA_FILE.to_string());

        Ok(ResolvedSettings { adapter, data_file })
    }
}

/// 命令列傳入的值先當 JSON 解析，失敗就當字串
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub async fn execute<L: LocalStore, R: RemoteTransport>(
    adapter: &StorageAdapter<L, R>,
    command: &Command,
) -> Result<Value> {
    match command {
        Command::Get { key } => Ok(adapter.get(key).await?.unwrap_or(Value::Null)),
        Command::Set { key, value } => {
            let success = adapter.set(key, parse_value(value)).await?;
            Ok(json!({ "success": success }))
        }
        Command::Update { key, value } => {
            let success = adapter.update(key, parse_value(value)).await?;
            Ok(json!({ "success": success }))
        }
        Command::Delete { key } => {
            let success = adapter.delete(key).await?;
            Ok(json!({ "success": success }))
        }
        Command::Stats => Ok(serde_json::to_value(adapter.stats().await)?),
        Command::Clear => Ok(json!({ "removed": adapter.clear_local().await })),
    }
}

pub fn exit_code(error: &StorageError) -> i32 {
    match error.kind() {
        ErrorKind::Configuration | ErrorKind::Local => 1,
        ErrorKind::Connectivity | ErrorKind::Auth => 2,
        ErrorKind::NotFound => 3,
    }
}
