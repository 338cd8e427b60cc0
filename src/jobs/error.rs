// Job registry errors

use crate::jobs::types::JobStatus;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },
}

pub type Result<T> = std::result::Result<T, JobError>;
