//! Handle on an in-flight training run.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::Model;
use crate::error::{PipelineError, Result};
use crate::types::TrainingProgress;

enum Outcome {
    Pending(JoinHandle<Result<Box<dyn Model>>>),
    Ready(Result<Box<dyn Model>>),
}

/// Progress events plus the eventual trained model.
///
/// Each epoch's [`TrainingProgress`] is delivered once, in order, through
/// [`next_progress`](Self::next_progress) or the [`Stream`] impl. The
/// stream ends when training stops. Dropping the handle does not stop the
/// worker; call [`cancel`](Self::cancel) for that.
pub struct TrainingRun {
    progress: mpsc::UnboundedReceiver<TrainingProgress>,
    outcome: Outcome,
    cancel: CancellationToken,
}

impl std::fmt::Debug for TrainingRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingRun")
            .field("pending", &matches!(self.outcome, Outcome::Pending(_)))
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl TrainingRun {
    /// Run `job` on the blocking pool of `runtime`.
    ///
    /// The job sends at most one event per epoch, so the progress channel is
    /// unbounded and the job never waits on the consumer.
    pub fn spawn<F>(runtime: &Handle, job: F) -> Self
    where
        F: FnOnce(mpsc::UnboundedSender<TrainingProgress>, CancellationToken) -> Result<Box<dyn Model>>
            + Send
            + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let handle = runtime.spawn_blocking(move || job(tx, worker_cancel));
        Self {
            progress: rx,
            outcome: Outcome::Pending(handle),
            cancel,
        }
    }

    /// An already finished run that replays `history` and yields `model`.
    pub fn completed(history: Vec<TrainingProgress>, model: Box<dyn Model>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        for event in history {
            // rx is alive, so send cannot fail
            let _ = tx.send(event);
        }
        Self {
            progress: rx,
            outcome: Outcome::Ready(Ok(model)),
            cancel: CancellationToken::new(),
        }
    }

    /// Next epoch's progress; `None` once training has stopped.
    pub async fn next_progress(&mut self) -> Option<TrainingProgress> {
        self.progress.recv().await
    }

    /// Ask the worker to stop before its next epoch.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for training to end and take the model.
    pub async fn finish(self) -> Result<Box<dyn Model>> {
        match self.outcome {
            Outcome::Pending(handle) => handle
                .await
                .map_err(|e| PipelineError::Training(format!("training worker failed: {e}")))?,
            Outcome::Ready(result) => result,
        }
    }
}

impl Stream for TrainingRun {
    type Item = TrainingProgress;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.progress.poll_recv(cx)
    }
}
