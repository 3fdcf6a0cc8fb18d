// src/engine/abort.rs

//! Sentinel used to unwind a build sequence after a fatal job condition.

use thiserror::Error;

use crate::types::JobStatus;

/// Returned once the job has recorded a fatal status, logged it, written the
/// status marker and terminated every running task.
///
/// This is not an ordinary error: the job already holds everything needed for
/// the final report, so callers stop their step sequence and swallow it.
#[derive(Debug, Clone, Error)]
#[error("job aborted ({status}): {message}")]
pub struct Abort {
    status: JobStatus,
    message: String,
}

impl Abort {
    pub(crate) fn new(status: JobStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
