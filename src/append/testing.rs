use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

use crate::storage::{MemoryStore, ObjectStore, StoreError, StoreLocation};

/// Memory store with injectable faults.
#[derive(Default)]
pub struct ScriptedStore {
    pub inner: MemoryStore,
    pub fail_exists: bool,
    /// Fails reads made before the first write.
    pub fail_reads: bool,
    pub fail_writes: bool,
    /// Number of writes whose read-back still returns stale content.
    pub stale_verifications: usize,
    /// Number of writes whose read-back fails outright.
    pub failing_verifications: usize,
    pub read_delay: Option<Duration>,
    /// The first two reads wait on this barrier after taking their snapshot,
    /// so both see the same content.
    pub read_gate: Option<Arc<Barrier>>,
    pub gated_reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub reads: AtomicUsize,
}

impl ScriptedStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for ScriptedStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        if self.fail_exists {
            return Err(StoreError::Network("connection reset".to_string()));
        }
        self.inner.exists(key).await
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.inner.read(key).await;
        if let Some(gate) = &self.read_gate {
            if self.gated_reads.fetch_add(1, Ordering::SeqCst) < 2 {
                gate.wait().await;
            }
        }
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }

        let writes = self.writes();
        if writes == 0 && self.fail_reads {
            return Err(StoreError::Status {
                status: 503,
                body: "SlowDown".to_string(),
            });
        }
        if writes > 0 && writes <= self.failing_verifications {
            return Err(StoreError::Network("connection reset".to_string()));
        }
        if writes > 0 && writes <= self.stale_verifications {
            return Ok(b"stale".to_vec());
        }
        snapshot
    }

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(StoreError::Status {
                status: 403,
                body: "AccessDenied".to_string(),
            });
        }
        self.inner.write(key, bytes).await
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<Option<String>, StoreError> {
        self.inner.signed_url(key, ttl).await
    }

    fn location(&self) -> StoreLocation {
        self.inner.location()
    }
}
