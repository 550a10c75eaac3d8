use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::{AppendOutcome, Appender};

#[derive(Debug, Error)]
#[error("append queue is closed")]
pub struct QueueClosed;

struct AppendJob {
    block: String,
    respond_to: oneshot::Sender<AppendOutcome>,
}

/// Handle to the task that owns the [`Appender`]. Jobs run one at a time in
/// arrival order, so appends from this process never interleave.
#[derive(Clone)]
pub struct AppendQueue {
    sender: mpsc::Sender<AppendJob>,
}

impl AppendQueue {
    pub fn spawn(appender: Appender, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        tokio::spawn(run(appender, receiver));
        Self { sender }
    }

    /// Queues `block` and waits for its outcome. Once queued, the job runs to
    /// completion even if the caller stops waiting.
    pub async fn append(&self, block: String) -> Result<AppendOutcome, QueueClosed> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(AppendJob { block, respond_to })
            .await
            .map_err(|_| QueueClosed)?;
        response.await.map_err(|_| QueueClosed)
    }
}

async fn run(appender: Appender, mut receiver: mpsc::Receiver<AppendJob>) {
    tracing::info!("Append queue started for {}", appender.key());

    while let Some(job) = receiver.recv().await {
        let outcome = appender.append(&job.block).await;
        if job.respond_to.send(outcome).is_err() {
            tracing::debug!("Submitter went away before its append finished");
        }
    }

    tracing::info!("Append queue for {} stopped", appender.key());
}
