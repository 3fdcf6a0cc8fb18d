// src/engine/journal.rs

//! Per-configuration run log and status marker.
//!
//! Every job-level line is emitted as a `tracing` event and appended, in
//! plain text, to `<work dir>/logfile.txt`.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use tracing::{error, info, warn};

use crate::errors::Result;
use crate::types::JobStatus;

pub const LOG_FILE_NAME: &str = "logfile.txt";

#[derive(Debug)]
pub struct Journal {
    configuration: String,
    dir: PathBuf,
    file: File,
}

impl Journal {
    /// Create the work directory if needed and open the run log for append.
    pub fn open(dir: &Path, configuration: &str) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("creating work dir {:?}", dir))?;
        let path = dir.join(LOG_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening run log {:?}", path))?;

        Ok(Self {
            configuration: configuration.to_string(),
            dir: dir.to_path_buf(),
            file,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn info(&mut self, message: &str) {
        info!(configuration = %self.configuration, "{message}");
        self.append(message);
    }

    pub fn warning(&mut self, message: &str) {
        warn!(configuration = %self.configuration, "{message}");
        self.append(&format!("Warning: {message}"));
    }

    pub fn error(&mut self, message: &str) {
        error!(configuration = %self.configuration, "{message}");
        self.append(&format!("ERROR: {message}"));
    }

    /// Log one output line of a task, picking the level from its content.
    pub fn task_line(&mut self, task: &str, line: &str) {
        if line.starts_with("Warning:") {
            warn!(task = %task, "{line}");
        } else if line.contains("ERROR:") {
            error!(task = %task, "{line}");
        } else {
            info!(task = %task, "{line}");
        }
        self.append(&format!("{task}: {line}"));
    }

    /// Write `<work dir>/<STATUS>` holding the last fatal message.
    pub fn write_marker(&self, status: JobStatus, message: &str) -> Result<()> {
        let path = self.dir.join(status.as_str());
        fs::write(&path, format!("{message}\n"))
            .with_context(|| format!("writing status marker {:?}", path))?;
        Ok(())
    }

    fn append(&mut self, message: &str) {
        let line = format!(
            "FPGA {} [{}] {}",
            Local::now().format("%H:%M:%S"),
            self.configuration,
            message
        );
        if let Err(e) = writeln!(self.file, "{line}") {
            warn!(error = %e, "failed to append to run log");
        }
    }
}
