use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Durable string-keyed blob storage.
///
/// Each key holds one serialized blob; there is no multi-key transaction, so
/// anything that must change atomically has to live under a single key.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the blob under `key`, `None` if nothing was ever written there.
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write (or overwrite) the blob under `key`.
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the blob under `key`; deleting a missing key is not an error.
    async fn remove_item(&self, key: &str) -> Result<()>;
}

/// In-process [`Storage`], lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.items.lock().await.remove(key);
        Ok(())
    }
}
