use crate::error::{Error, Result};
use crate::types::{JobId, LogLine};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Initializing,
    Building,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// The record of a single build request.
///
/// Only the store actor mutates a `Job`, and only through [`Job::apply`], which is where the
/// lifecycle rules live: status moves forward only, progress never decreases, and nothing changes
/// once the job is completed or errored.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub logs: Vec<LogLine>,
    pub file_path: Option<PathBuf>,
}

/// A single mutation requested by the pipeline that owns the job.
#[derive(Clone, Debug)]
pub enum JobUpdate {
    Building,
    Progress(u8),
    Log(LogLine),
    Complete { file_path: PathBuf },
    Fail { message: String },
}

impl Job {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Initializing,
            progress: 0,
            logs: Vec::new(),
            file_path: None,
        }
    }

    pub fn apply(&mut self, update: JobUpdate) -> Result<()> {
        if self.status.is_terminal() {
            return Err(Error::Finished(self.id));
        }
        match update {
            JobUpdate::Building => self.status = JobStatus::Building,
            JobUpdate::Progress(progress) => {
                // lower values are stale, never move backwards
                self.progress = self.progress.max(progress.min(100));
            }
            JobUpdate::Log(line) => self.logs.push(line),
            JobUpdate::Complete { file_path } => {
                self.status = JobStatus::Completed;
                self.progress = 100;
                self.file_path = Some(file_path);
            }
            JobUpdate::Fail { message } => {
                self.status = JobStatus::Error;
                self.logs.push(message);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use uuid::Uuid;

    #[test]
    fn progress_never_decreases() {
        let mut job = Job::new(Uuid::new_v4());
        job.apply(JobUpdate::Progress(40)).unwrap();
        job.apply(JobUpdate::Progress(10)).unwrap();
        assert_eq!(job.progress, 40);
        job.apply(JobUpdate::Progress(250)).unwrap();
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn finished_jobs_reject_updates() {
        let mut job = Job::new(Uuid::new_v4());
        job.apply(JobUpdate::Building).unwrap();
        job.apply(JobUpdate::Fail {
            message: "Build failed: boom".into(),
        })
        .unwrap();

        assert_eq!(
            job.apply(JobUpdate::Log("late".into())),
            Err(Error::Finished(job.id))
        );
        assert_eq!(
            job.apply(JobUpdate::Complete {
                file_path: "/tmp/app.dmg".into()
            }),
            Err(Error::Finished(job.id))
        );
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.file_path.is_none());
        assert_eq!(job.logs.last().unwrap(), "Build failed: boom");
    }

    #[test]
    fn file_path_only_set_on_completion() {
        let mut job = Job::new(Uuid::new_v4());
        assert!(job.file_path.is_none());
        job.apply(JobUpdate::Building).unwrap();
        job.apply(JobUpdate::Progress(90)).unwrap();
        assert!(job.file_path.is_none());
        job.apply(JobUpdate::Complete {
            file_path: "/tmp/ws/dist/app.dmg".into(),
        })
        .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(
            job.file_path.as_deref(),
            Some(Path::new("/tmp/ws/dist/app.dmg"))
        );
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let job = Job::new(Uuid::nil());
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "initializing");
        assert_eq!(value["progress"], 0);
        assert!(value["filePath"].is_null());
        assert!(value["logs"].as_array().unwrap().is_empty());
    }
}
