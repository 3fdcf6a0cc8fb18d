use std::fmt;

/// Canonical task name type used in logs and configuration.
pub type TaskName = String;

/// Aggregate status of a job.
///
/// Status only ever degrades: once it leaves `Ok` it never returns, and no new
/// task may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Ok,
    Error,
    Timeout,
}

impl JobStatus {
    /// Process exit code for this status. Wrapping CLIs rely on these values.
    pub fn exit_code(self) -> i32 {
        match self {
            JobStatus::Ok => 0,
            JobStatus::Timeout => 8,
            JobStatus::Error => 16,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Ok => "OK",
            JobStatus::Error => "ERROR",
            JobStatus::Timeout => "TIMEOUT",
        }
    }

    pub fn is_ok(self) -> bool {
        self == JobStatus::Ok
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
