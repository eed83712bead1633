use super::messages::StoreMessage;
use crate::actors::broadcaster::BroadcasterHandle;
use crate::error::{self, Error};
use crate::job::{Job, JobUpdate};
use crate::types::{JobId, LogLine};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::trace;

struct Entry {
    job: Job,
    broadcaster: BroadcasterHandle,
    // dropped once the job is finished, which closes every live log stream
    log_tx: Option<mpsc::UnboundedSender<LogLine>>,
}

pub struct JobStore {
    inbox: mpsc::Receiver<StoreMessage>,
    jobs: HashMap<JobId, Entry>,
}

impl JobStore {
    pub fn spawn(inbox: mpsc::Receiver<StoreMessage>) {
        let actor = Self {
            inbox,
            jobs: HashMap::new(),
        };
        tokio::spawn(async move { actor.run().await });
    }

    async fn run(mut self) {
        use self::StoreMessage::*;
        while let Some(msg) = self.inbox.recv().await {
            match msg {
                Create { job_id, response } => {
                    let _ = response.send(self.create(job_id));
                }
                Get { job_id, response } => {
                    let _ = response.send(self.get(job_id));
                }
                Update {
                    job_id,
                    update,
                    response,
                } => {
                    let _ = response.send(self.update(job_id, update));
                }
                Subscribe { job_id, response } => {
                    let _ = response.send(self.subscribe(job_id));
                }
            }
        }
        trace!(jobs = self.jobs.len(), "job store shutting down");
    }

    fn create(&mut self, job_id: JobId) -> error::Result<Job> {
        if self.jobs.contains_key(&job_id) {
            return Err(Error::AlreadyExists(job_id));
        }
        let (log_tx, log_rx) = mpsc::unbounded_channel();
        let job = Job::new(job_id);
        self.jobs.insert(
            job_id,
            Entry {
                job: job.clone(),
                broadcaster: BroadcasterHandle::spawn(log_rx),
                log_tx: Some(log_tx),
            },
        );
        Ok(job)
    }

    fn get(&self, job_id: JobId) -> error::Result<Job> {
        self.jobs
            .get(&job_id)
            .map(|entry| entry.job.clone())
            .ok_or(Error::NotFound(job_id))
    }

    fn update(&mut self, job_id: JobId, update: JobUpdate) -> error::Result<()> {
        let entry = self.jobs.get_mut(&job_id).ok_or(Error::NotFound(job_id))?;
        let new_line = match &update {
            JobUpdate::Log(line) => Some(line.clone()),
            JobUpdate::Fail { message } => Some(message.clone()),
            _ => None,
        };
        entry.job.apply(update)?;

        if let (Some(line), Some(log_tx)) = (new_line, &entry.log_tx) {
            let _ = log_tx.send(line);
        }
        if entry.job.status.is_terminal() {
            entry.log_tx = None;
        }
        Ok(())
    }

    fn subscribe(&self, job_id: JobId) -> error::Result<mpsc::UnboundedReceiver<LogLine>> {
        let entry = self.jobs.get(&job_id).ok_or(Error::NotFound(job_id))?;
        let (tx, rx) = mpsc::unbounded_channel();
        entry.broadcaster.subscribe(tx);
        Ok(rx)
    }
}
