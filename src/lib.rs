pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::Cli;

pub use adapters::{FileLocalStore, HttpTransport, MemoryLocalStore};
pub use config::{AdapterConfig, FailoverPolicy, StorageMode};
pub use self::core::StorageAdapter;
pub use domain::model::{CacheEntry, ItemStats, StorageStats, StoredRecord};
pub use domain::ports::{Clock, LocalStore, RemoteTransport, SystemClock};
pub use utils::error::{ErrorKind, Result, StorageError};
