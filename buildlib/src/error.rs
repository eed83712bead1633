use crate::types::JobId;
use std::result;
use thiserror;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("No such job: {0}")]
    NotFound(JobId),
    #[error("Job {0} already exists")]
    AlreadyExists(JobId),
    #[error("Job {0} has already finished")]
    Finished(JobId),
    #[error("Job store is no longer running")]
    StoreClosed,
}

pub type Result<T> = result::Result<T, Error>;
