pub mod adapter;
pub mod merge;

pub use crate::domain::model::{CacheEntry, ItemStats, StorageStats, StoredRecord};
pub use crate::domain::ports::{Clock, LocalStore, RemoteTransport, SystemClock};
pub use crate::utils::error::Result;
pub use adapter::StorageAdapter;
