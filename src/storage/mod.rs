mod local;
mod memory;
mod s3;
mod sigv4;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use s3::{S3Credentials, S3Store};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("request failed: {0}")]
    Network(String),

    #[error("store responded {status}: {body}")]
    Status { status: u16, body: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Where results are written, reported back to clients for diagnostics.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoreLocation {
    pub backend: &'static str,
    pub bucket: String,
    pub region: String,
}

/// Minimal capability surface over a single bucket. Stores never retry;
/// retry policy belongs to the caller.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Time-limited GET URL for the object, `None` if the backend cannot hand
    /// out URLs and the caller has to stream the bytes itself.
    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<Option<String>, StoreError>;

    fn location(&self) -> StoreLocation;
}

pub fn generate_submission_id() -> String {
    format!(
        "{}_{}",
        Utc::now().format("%Y%m%d"),
        &Uuid::new_v4().to_string()[..8]
    )
}
