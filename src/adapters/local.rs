use crate::domain::ports::LocalStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// 記憶體內的本地存儲，clone 之後共用同一份資料
#[derive(Debug, Clone, Default)]
pub struct MemoryLocalStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> crate::utils::error::StorageError {
        std::io::Error::other("local store lock poisoned").into()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn read_raw(&self, full_key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        Ok(entries.get(full_key).cloned())
    }

    async fn write_raw(&self, full_key: &str, raw: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        entries.insert(full_key.to_string(), raw.to_string());
        Ok(())
    }

    async fn delete_raw(&self, full_key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        entries.remove(full_key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// 以單一 JSON 檔保存的本地存儲。
///
/// The whole map is kept in memory and rewritten on every change through a
/// temp file followed by a rename, so a crash never leaves a half-written file.
#[derive(Debug)]
pub struct FileLocalStore {
    path: PathBuf,
    entries: tokio::sync::Mutex<BTreeMap<String, String>>,
}

impl FileLocalStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            "Opened local store {} with {} entries",
            path.display(),
            entries.len()
        );

        Ok(Self {
            path,
            entries: tokio::sync::Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let data = serde_json::to_vec_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl LocalStore for FileLocalStore {
    async fn read_raw(&self, full_key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(full_key).cloned())
    }

    async fn write_raw(&self, full_key: &str, raw: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let mut updated = entries.clone();
        updated.insert(full_key.to_string(), raw.to_string());
        self.persist(&updated).await?;
        *entries = updated;
        Ok(())
    }

    async fn delete_raw(&self, full_key: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(full_key) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(full_key);
        self.persist(&updated).await?;
        *entries = updated;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store_basic_operations() {
        let store = MemoryLocalStore::new();
        assert!(store.read_raw("a:1").await.unwrap().is_none());

        store.write_raw("a:1", "one").await.unwrap();
        store.write_raw("b:1", "other").await.unwrap();
        assert_eq!(store.read_raw("a:1").await.unwrap().as_deref(), Some("one"));
        assert_eq!(store.list_keys("a:").await.unwrap(), vec!["a:1".to_string()]);

        store.delete_raw("a:1").await.unwrap();
        store.delete_raw("a:1").await.unwrap();
        assert!(store.read_raw("a:1").await.unwrap().is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("store.json");

        {
            let store = FileLocalStore::open(&path).await.unwrap();
            store.write_raw("app:profile", "{\"value\":1}").await.unwrap();
            store.write_raw("app:tmp", "x").await.unwrap();
            store.delete_raw("app:tmp").await.unwrap();
        }

        let reopened = FileLocalStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.read_raw("app:profile").await.unwrap().as_deref(),
            Some("{\"value\":1}")
        );
        assert!(reopened.read_raw("app:tmp").await.unwrap().is_none());
        assert_eq!(
            reopened.list_keys("app:").await.unwrap(),
            vec!["app:profile".to_string()]
        );
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        assert!(FileLocalStore::open(&path).await.is_err());
    }
}
