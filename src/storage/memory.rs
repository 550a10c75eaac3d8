use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{ObjectStore, StoreError, StoreLocation};

/// Process-local store. Contents vanish on restart.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.objects.lock().await.insert(key.to_string(), bytes.into());
    }

    pub async fn get_text(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .await
            .get(key)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.objects.lock().await.contains_key(key))
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.objects.lock().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn signed_url(&self, _key: &str, _ttl: Duration) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    fn location(&self) -> StoreLocation {
        StoreLocation {
            backend: "memory",
            bucket: String::new(),
            region: String::new(),
        }
    }
}
