mod actor;
mod messages;

use self::{
    actor::JobStore,
    messages::StoreMessage::{self, Create, Get, Subscribe, Update},
};
use crate::error::{self, Error};
use crate::job::{Job, JobUpdate};
use crate::types::{JobId, LogLine};
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

/// A `JobStore` which owns every job record and applies updates to them one at a time.
///
/// This struct is actually an actor handle, the real work is done in the actor spawned by
/// `JobStoreHandle::spawn`. The handle can be cloned freely across tasks without an
/// `Arc<Mutex>`: the job map lives inside the actor and is only ever touched by it, so a write
/// that has been acknowledged is visible to every read sent after it.
///
/// The map is populated on demand and only dropped when every handle is gone. Finished jobs are
/// never evicted, so memory grows with the number of builds served by the process.
#[derive(Clone)]
pub struct JobStoreHandle {
    sender: mpsc::Sender<StoreMessage>,
}

impl JobStoreHandle {
    /// Spawn a new store.
    ///
    /// Specify the capacity for the store's message queue. This limits the build-up of inbound
    /// messages.
    pub fn spawn(message_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(message_capacity);
        JobStore::spawn(receiver);
        Self { sender }
    }

    /// Create a new job in the `initializing` state. Fails if the id is taken.
    pub async fn create(&self, job_id: JobId) -> error::Result<Job> {
        self.request(|response| Create { job_id, response }).await
    }

    /// Get a snapshot of a job.
    pub async fn get(&self, job_id: JobId) -> error::Result<Job> {
        self.request(|response| Get { job_id, response }).await
    }

    pub async fn update(&self, job_id: JobId, update: JobUpdate) -> error::Result<()> {
        self.request(|response| Update {
            job_id,
            update,
            response,
        })
        .await
    }

    pub async fn mark_building(&self, job_id: JobId) -> error::Result<()> {
        self.update(job_id, JobUpdate::Building).await
    }

    pub async fn set_progress(&self, job_id: JobId, progress: u8) -> error::Result<()> {
        self.update(job_id, JobUpdate::Progress(progress)).await
    }

    pub async fn append_log(&self, job_id: JobId, line: impl Into<LogLine>) -> error::Result<()> {
        self.update(job_id, JobUpdate::Log(line.into())).await
    }

    pub async fn complete(&self, job_id: JobId, file_path: PathBuf) -> error::Result<()> {
        self.update(job_id, JobUpdate::Complete { file_path }).await
    }

    pub async fn fail(&self, job_id: JobId, message: impl Into<String>) -> error::Result<()> {
        self.update(
            job_id,
            JobUpdate::Fail {
                message: message.into(),
            },
        )
        .await
    }

    /// Follow a job's log: every line so far, then new lines until the job finishes.
    pub async fn subscribe(
        &self,
        job_id: JobId,
    ) -> error::Result<mpsc::UnboundedReceiver<LogLine>> {
        self.request(|response| Subscribe { job_id, response }).await
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<error::Result<T>>) -> StoreMessage,
    ) -> error::Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(message(tx))
            .await
            .map_err(|_| Error::StoreClosed)?;
        rx.await.map_err(|_| Error::StoreClosed)?
    }
}
