use std::sync::Arc;

use crate::append::{AppendQueue, Appender};
use crate::config::{Config, StoreBackend};
use crate::storage::{LocalStore, MemoryStore, ObjectStore, S3Credentials, S3Store, StoreError};

const APPEND_QUEUE_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ObjectStore>,
    pub appends: AppendQueue,
}

impl AppState {
    /// Must be called inside a Tokio runtime: spawns the append queue.
    pub fn new(config: Arc<Config>, store: Arc<dyn ObjectStore>) -> Self {
        let appender = Appender::new(
            store.clone(),
            config.results_key.clone(),
            config.read_failure,
        );

        Self {
            appends: AppendQueue::spawn(appender, APPEND_QUEUE_CAPACITY),
            config,
            store,
        }
    }
}

pub fn open_store(backend: &StoreBackend) -> Result<Arc<dyn ObjectStore>, StoreError> {
    let store: Arc<dyn ObjectStore> = match backend {
        StoreBackend::S3 {
            bucket,
            region,
            endpoint,
            path_style,
            access_key_id,
            secret_access_key,
            session_token,
        } => Arc::new(S3Store::new(
            endpoint,
            bucket.clone(),
            region.clone(),
            *path_style,
            Some(S3Credentials {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
                session_token: session_token.clone(),
            }),
        )?),
        StoreBackend::Local { root } => Arc::new(LocalStore::new(root.clone())),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
