#![allow(dead_code)]

use std::error::Error;

use fpga_flow::engine::{Job, JobOptions};
use tempfile::TempDir;

pub type TestResult = Result<(), Box<dyn Error>>;

pub const CONFIGURATION: &str = "test";

/// A job whose work directory is `<dir>/test`.
pub fn job_in(dir: &TempDir) -> Job {
    fpga_flow_test_utils::init_tracing();
    Job::new(JobOptions::new(CONFIGURATION, dir.path())).expect("open job work dir")
}

pub fn position(lines: &[String], wanted: &str) -> usize {
    lines
        .iter()
        .position(|l| l == wanted)
        .unwrap_or_else(|| panic!("log line {wanted:?} missing from {lines:#?}"))
}
