use std::{
    future::Future,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::warn;

/// Store keys. One key is the granularity of last-write-wins persistence.
pub mod keys {
    pub const SETTINGS: &str = "settings";
    pub const CATEGORIES: &str = "categories";
    pub const DAILY: &str = "daily";
    pub const WEEKLY: &str = "weekly";
    pub const MONTHLY: &str = "monthly";
    pub const HISTORY: &str = "history";
    pub const REPORTS: &str = "reports";
}

/// Interface for abstracting the durable key-value state store. The core
/// treats it as the sole source of truth and keeps no cache across handler
/// invocations.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>>> + Send;

    /// Persists several keys as one logical update. Each key is
    /// last-write-wins; there is no cross-key transaction.
    fn set(&self, entries: Vec<(&'static str, Value)>) -> impl Future<Output = Result<()>> + Send;

    /// Returns everything currently stored, keyed as written.
    fn snapshot(&self) -> impl Future<Output = Result<Map<String, Value>>> + Send;

    fn clear(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Reads and deserializes one key. A value that no longer matches the
/// expected shape is discarded as if absent.
pub async fn read<T: DeserializeOwned>(store: &impl StateStore, key: &str) -> Result<Option<T>> {
    let Some(value) = store.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_value(value) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            warn!("Discarding malformed value under key {key}: {e}");
            Ok(None)
        }
    }
}

pub async fn read_or_default<T: DeserializeOwned + Default>(
    store: &impl StateStore,
    key: &str,
) -> Result<T> {
    Ok(read(store, key).await?.unwrap_or_default())
}

/// Builds one entry of a [StateStore::set] batch.
pub fn entry<T: Serialize>(key: &'static str, value: &T) -> Result<(&'static str, Value)> {
    Ok((key, serde_json::to_value(value)?))
}

/// The main realization of [StateStore]. Every key lives in its own JSON
/// file so concurrent processes only contend on the keys they touch.
pub struct JsonFileStore {
    state_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(state_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&state_dir)?;

        Ok(Self { state_dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.state_dir.join(format!("{key}.json"))
    }

    async fn write_value(file: &mut File, value: &Value) -> Result<()> {
        file.set_len(0).await?;
        let mut buffer = serde_json::to_vec(value)?;
        buffer.push(b'\n');
        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_value(path: &Path) -> Result<Option<String>> {
        let mut file = match File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        file.lock_shared()?;
        let mut text = String::new();
        let result = file.read_to_string(&mut text).await;
        file.unlock_async().await?;
        result?;
        Ok(Some(text))
    }
}

impl StateStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.key_path(key);
        let Some(text) = Self::read_value(&path).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Might happen after a shutdown cut a write short.
                warn!("Found illegal json under {path:?}: {e}");
                Ok(None)
            }
        }
    }

    async fn set(&self, entries: Vec<(&'static str, Value)>) -> Result<()> {
        for (key, value) in &entries {
            let mut file = File::options()
                .write(true)
                .create(true)
                .truncate(false)
                .open(self.key_path(key))
                .await?;

            // Semi-safe acquire-release for a file
            file.lock_exclusive()?;
            let result = Self::write_value(&mut file, value).await;
            file.unlock_async().await?;
            result?;
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<Map<String, Value>> {
        let mut snapshot = Map::new();
        let mut dir = tokio::fs::read_dir(&self.state_dir).await?;
        while let Some(file) = dir.next_entry().await? {
            let path = file.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(key) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            if let Some(value) = self.get(&key).await? {
                snapshot.insert(key, value);
            }
        }
        Ok(snapshot)
    }

    async fn clear(&self) -> Result<()> {
        let mut dir = tokio::fs::read_dir(&self.state_dir).await?;
        while let Some(file) = dir.next_entry().await? {
            let path = file.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                tokio::fs::remove_file(path).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };

    use anyhow::{bail, Result};
    use serde_json::{Map, Value};

    use super::StateStore;

    /// In-memory store for exercising the aggregation pipeline without a
    /// filesystem, with an optional injected write failure.
    pub(crate) struct MemoryStore {
        data: Mutex<Map<String, Value>>,
        failing: AtomicBool,
    }

    impl MemoryStore {
        pub(crate) fn new() -> Self {
            Self {
                data: Mutex::new(Map::new()),
                failing: AtomicBool::new(false),
            }
        }

        pub(crate) fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    impl StateStore for MemoryStore {
        async fn get(&self, key: &str) -> Result<Option<Value>> {
            if self.failing.load(Ordering::SeqCst) {
                bail!("store unavailable");
            }
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, entries: Vec<(&'static str, Value)>) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                bail!("store unavailable");
            }
            let mut data = self.data.lock().unwrap();
            for (key, value) in entries {
                data.insert(key.to_owned(), value);
            }
            Ok(())
        }

        async fn snapshot(&self) -> Result<Map<String, Value>> {
            Ok(self.data.lock().unwrap().clone())
        }

        async fn clear(&self) -> Result<()> {
            self.data.lock().unwrap().clear();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_store_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonFileStore::new(dir.path().to_owned())?;

        store
            .set(vec![
                ("daily", json!({"total": 120})),
                ("history", json!([])),
            ])
            .await?;

        assert_eq!(store.get("daily").await?, Some(json!({"total": 120})));
        assert_eq!(store.get("history").await?, Some(json!([])));
        assert_eq!(store.get("weekly").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_store_last_write_wins() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonFileStore::new(dir.path().to_owned())?;

        store.set(vec![("daily", json!({"total": 1}))]).await?;
        store.set(vec![("daily", json!({"total": 2}))]).await?;

        assert_eq!(store.get("daily").await?, Some(json!({"total": 2})));
        Ok(())
    }

    #[tokio::test]
    async fn test_store_snapshot_and_clear() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonFileStore::new(dir.path().to_owned())?;

        store
            .set(vec![("settings", json!({"notifications": true}))])
            .await?;

        let snapshot = store.snapshot().await?;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["settings"], json!({"notifications": true}));

        store.clear().await?;
        assert!(store.snapshot().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_value_reads_as_absent() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonFileStore::new(dir.path().to_owned())?;

        std::fs::write(dir.path().join("daily.json"), b"{\"total\": 12")?;

        assert_eq!(store.get("daily").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_typed_read_discards_mismatched_shape() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonFileStore::new(dir.path().to_owned())?;

        store.set(vec![("history", json!({"not": "a list"}))]).await?;

        let history: Option<Vec<crate::storage::entities::HistoryEntry>> =
            read(&store, "history").await?;
        assert_eq!(history, None);
        Ok(())
    }
}
