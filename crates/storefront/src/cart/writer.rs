//! Ordered background writes of the signed-in cart.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use sareine_core::{UserDocument, UserId};

use crate::store::DocumentStore;

enum WriteRequest {
    Save(UserDocument),
    Flush(oneshot::Sender<()>),
}

/// Queue of remote cart writes for one user.
///
/// Writes are applied one at a time in the order they were enqueued. Each
/// write carries the full cart, so replaying one is harmless. A failed write
/// is logged and dropped; the optimistic in-memory cart stays as it is.
///
/// Dropping the writer closes the queue; writes already queued still run.
pub(crate) struct RemoteWriter {
    tx: mpsc::UnboundedSender<WriteRequest>,
    task: JoinHandle<()>,
}

impl RemoteWriter {
    pub(crate) fn spawn(remote: Arc<dyn DocumentStore>, user: UserId) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                match request {
                    WriteRequest::Save(patch) => {
                        if let Err(e) = remote.set_merge(&user, patch).await {
                            error!(user = %user, error = %e, "Failed to persist cart to account");
                        } else {
                            debug!(user = %user, "Cart persisted to account");
                        }
                    }
                    WriteRequest::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { tx, task }
    }

    /// Queue a merge-write of `patch`.
    pub(crate) fn enqueue(&self, patch: UserDocument) {
        if self.tx.send(WriteRequest::Save(patch)).is_err() {
            error!("Cart writer has stopped, dropping cart write");
        }
    }

    /// Queue a flush marker. The returned future resolves once every write
    /// queued before this call has been attempted.
    pub(crate) fn flush(&self) -> impl Future<Output = ()> + use<> {
        let (done, wait) = oneshot::channel();
        let queued = self.tx.send(WriteRequest::Flush(done)).is_ok();
        async move {
            if queued {
                let _ = wait.await;
            }
        }
    }

    /// Close the queue and wait for the remaining writes to finish.
    pub(crate) async fn close(self) {
        let Self { tx, task } = self;
        drop(tx);
        if let Err(e) = task.await {
            error!(error = %e, "Cart writer task failed");
        }
    }
}
