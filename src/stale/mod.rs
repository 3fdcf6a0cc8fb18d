// src/stale/mod.rs

//! Incremental-rebuild decision based on modification timestamps.
//!
//! A step is up to date when its output exists and is strictly newer than
//! every declared input. Equal timestamps count as stale so that coarse
//! filesystem clocks never produce a false "up to date".

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::errors::{FlowError, Result};
use crate::fs::FileSystem;

/// Declared inputs and the single output artifact of a build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Freshness {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
}

impl Freshness {
    pub fn new(inputs: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output: output.into(),
        }
    }

    pub fn needs_rebuild(&self, fs: &dyn FileSystem) -> Result<bool> {
        needs_rebuild(fs, &self.inputs, &self.output)
    }
}

/// Decide whether the step producing `output` from `inputs` must run.
///
/// A missing input is an error: staleness cannot be judged without every
/// declared input present.
pub fn needs_rebuild<P: AsRef<Path>>(
    fs: &dyn FileSystem,
    inputs: &[P],
    output: &Path,
) -> Result<bool> {
    let output_time = match fs.modified(output) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(output = ?output, "output missing; rebuild needed");
            return Ok(true);
        }
        Err(e) => return Err(FlowError::IoError(e)),
    };

    let mut latest_input: Option<SystemTime> = None;
    for input in inputs {
        let input = input.as_ref();
        let t = fs.modified(input).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FlowError::MissingInput {
                path: input.to_path_buf(),
            },
            _ => FlowError::IoError(e),
        })?;
        latest_input = Some(latest_input.map_or(t, |l| l.max(t)));
    }

    let stale = latest_input.is_some_and(|latest| latest >= output_time);
    debug!(output = ?output, stale, "staleness evaluated");
    Ok(stale)
}
