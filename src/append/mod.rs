//! Read-modify-write append of CSV rows to the shared results object.
//!
//! The object store has no append primitive, so every submission fetches the
//! current object, concatenates its block and writes the whole object back,
//! then reads it again to check the block landed. Two appenders running this
//! concurrently over the same prior content will lose one of the blocks; the
//! [`AppendQueue`] serializes appends coming from this process.

mod queue;
#[cfg(test)]
mod testing;

pub use queue::{AppendQueue, QueueClosed};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::results::HEADER;
use crate::storage::ObjectStore;

pub const MAX_ATTEMPTS: usize = 3;
const TAIL_LINES: usize = 5;

/// What to do when the current object exists but cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFailurePolicy {
    /// Give up without writing.
    #[default]
    Abort,
    /// Carry on as if the object did not exist. Overwrites whatever is stored.
    TreatAsMissing,
}

impl FromStr for ReadFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(ReadFailurePolicy::Abort),
            "treat-as-missing" | "treat_as_missing" => Ok(ReadFailurePolicy::TreatAsMissing),
            other => Err(format!(
                "unknown read failure policy {other:?}, expected abort or treat-as-missing"
            )),
        }
    }
}

impl fmt::Display for ReadFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadFailurePolicy::Abort => write!(f, "abort"),
            ReadFailurePolicy::TreatAsMissing => write!(f, "treat-as-missing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendStatus {
    Verified,
    /// The store rejected a write. Not retried.
    WriteFailed(String),
    /// Every attempt wrote successfully but the block never showed up on read-back.
    VerificationFailed,
    /// The existing object could not be loaded and the policy is abort.
    ReadFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    pub status: AppendStatus,
    pub attempts: usize,
    pub existed: bool,
    pub before_tail: String,
    pub after_tail: String,
}

impl AppendOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == AppendStatus::Verified
    }

    pub fn error_message(&self) -> Option<String> {
        match &self.status {
            AppendStatus::Verified => None,
            AppendStatus::WriteFailed(e) => Some(format!("write failed: {e}")),
            AppendStatus::VerificationFailed => Some(format!(
                "appended rows not found after {} attempts",
                self.attempts
            )),
            AppendStatus::ReadFailed(e) => Some(format!("reading existing results failed: {e}")),
        }
    }
}

pub struct Appender {
    store: Arc<dyn ObjectStore>,
    key: String,
    read_failure: ReadFailurePolicy,
    max_attempts: usize,
}

impl Appender {
    pub fn new(store: Arc<dyn ObjectStore>, key: String, read_failure: ReadFailurePolicy) -> Self {
        Self {
            store,
            key,
            read_failure,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Existing content, `None` when absent. `Err` only under [`ReadFailurePolicy::Abort`].
    ///
    /// A failed existence check falls through to a plain read, where a
    /// missing object still counts as absent.
    async fn load_existing(&self) -> Result<Option<String>, String> {
        match self.store.exists(&self.key).await {
            Ok(false) => return Ok(None),
            Ok(true) => {}
            Err(e) => tracing::warn!(
                "Existence check for {} failed, reading it directly: {}",
                self.key,
                e
            ),
        }

        match self.store.read(&self.key).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => match self.read_failure {
                ReadFailurePolicy::Abort => Err(e.to_string()),
                ReadFailurePolicy::TreatAsMissing => {
                    tracing::warn!(
                        "Reading {} failed, starting a fresh file over it: {}",
                        self.key, e
                    );
                    Ok(None)
                }
            },
        }
    }

    pub async fn append(&self, block: &str) -> AppendOutcome {
        if block.is_empty() {
            return AppendOutcome {
                status: AppendStatus::Verified,
                attempts: 0,
                existed: false,
                before_tail: String::new(),
                after_tail: String::new(),
            };
        }

        let existing = match self.load_existing().await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::error!("Not appending to {}: {}", self.key, e);
                return AppendOutcome {
                    status: AppendStatus::ReadFailed(e),
                    attempts: 0,
                    existed: false,
                    before_tail: String::new(),
                    after_tail: String::new(),
                };
            }
        };

        let existed = existing.is_some();
        let before_tail = existing.as_deref().map(tail).unwrap_or_default();
        let content = compose(existing.as_deref(), block);

        let mut attempts = 0;
        let mut after_tail = String::new();
        let mut status = AppendStatus::VerificationFailed;

        while attempts < self.max_attempts {
            attempts += 1;

            if let Err(e) = self.store.write(&self.key, content.clone().into_bytes()).await {
                tracing::error!("Write to {} failed on attempt {}: {}", self.key, attempts, e);
                status = AppendStatus::WriteFailed(e.to_string());
                break;
            }

            match self.store.read(&self.key).await {
                Ok(bytes) => {
                    let stored = String::from_utf8_lossy(&bytes);
                    after_tail = tail(&stored);
                    if stored.ends_with(block) || stored.contains(block) {
                        status = AppendStatus::Verified;
                        break;
                    }
                    tracing::warn!(
                        "Appended rows missing from {} after attempt {} ({} bytes read back)",
                        self.key,
                        attempts,
                        bytes.len()
                    );
                }
                Err(e) => tracing::warn!(
                    "Read-back of {} failed after attempt {}: {}",
                    self.key, attempts, e
                ),
            }
        }

        if status == AppendStatus::Verified {
            tracing::info!(
                "Appended {} bytes to {} in {} attempt(s)",
                block.len(),
                self.key,
                attempts
            );
        }

        AppendOutcome {
            status,
            attempts,
            existed,
            before_tail,
            after_tail,
        }
    }
}

/// Existing content (or the header for a new file) followed by `block`.
pub fn compose(existing: Option<&str>, block: &str) -> String {
    let mut content = match existing {
        Some(text) if !text.trim().is_empty() => {
            let mut text = text.to_string();
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text
        }
        _ => HEADER.to_string(),
    };
    content.push_str(block);
    content
}

fn tail(text: &str) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
    lines[lines.len().saturating_sub(TAIL_LINES)..].join("\n")
}
