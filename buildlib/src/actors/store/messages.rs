use crate::error;
use crate::job::{Job, JobUpdate};
use crate::types::{JobId, LogLine};
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
pub enum StoreMessage {
    Create {
        job_id: JobId,
        response: oneshot::Sender<error::Result<Job>>,
    },
    Get {
        job_id: JobId,
        response: oneshot::Sender<error::Result<Job>>,
    },
    Update {
        job_id: JobId,
        update: JobUpdate,
        response: oneshot::Sender<error::Result<()>>,
    },
    Subscribe {
        job_id: JobId,
        response: oneshot::Sender<error::Result<mpsc::UnboundedReceiver<LogLine>>>,
    },
}
