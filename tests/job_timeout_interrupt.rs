// tests/job_timeout_interrupt.rs
#![cfg(unix)]

mod common;

use std::time::{Duration, Instant};

use common::{TestResult, CONFIGURATION};
use fpga_flow::dag::{TaskSpec, TaskState};
use fpga_flow::engine::{Job, JobOptions};
use fpga_flow::types::JobStatus;
use fpga_flow_test_utils::{init_tracing, log_messages, read_marker, with_timeout};
use tempfile::tempdir;

#[tokio::test]
async fn timeout_terminates_everything() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let options =
        JobOptions::new(CONFIGURATION, dir.path()).with_timeout(Some(Duration::from_secs(1)));
    let mut job = Job::new(options)?;

    let slow = job.register(TaskSpec::new("slow", "sleep 5"));
    let after = job.register(TaskSpec::new("after", "true").after(slow));

    let started = Instant::now();
    let abort = with_timeout(job.run()).await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(4));

    assert_eq!(abort.status(), JobStatus::Timeout);
    assert_eq!(job.task_state(slow), TaskState::Terminated);
    assert_eq!(job.task_state(after), TaskState::Pending);
    assert_eq!(job.finalize(), 8);

    let log = log_messages(job.work_dir());
    assert!(log.contains(&"Reached TIMEOUT (1 seconds). Terminating all tasks.".to_string()));
    assert!(log.contains(&"slow: terminating process".to_string()));
    assert_eq!(log.last().map(String::as_str), Some("DONE (TIMEOUT, rc=8)"));
    assert!(read_marker(job.work_dir(), "TIMEOUT").is_some());
    Ok(())
}

#[tokio::test]
async fn interrupt_request_stops_the_job() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let mut job = Job::new(JobOptions::new(CONFIGURATION, dir.path()))?;

    let t = job.register(TaskSpec::new("t", "sleep 5"));

    let handle = job.interrupt_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.request();
    });

    let started = Instant::now();
    let abort = with_timeout(job.run()).await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(3));

    assert_eq!(abort.status(), JobStatus::Error);
    assert_eq!(job.task_state(t), TaskState::Terminated);
    assert_eq!(job.finalize(), 16);
    assert!(read_marker(job.work_dir(), "ERROR").is_some());
    Ok(())
}

#[tokio::test]
async fn interrupt_before_run_starts_nothing() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let mut job = Job::new(JobOptions::new(CONFIGURATION, dir.path()))?;

    let t = job.register(TaskSpec::new("t", "true"));
    job.interrupt_handle().request();

    assert!(with_timeout(job.run()).await.is_err());
    assert_eq!(job.task_state(t), TaskState::Pending);
    assert_eq!(job.finalize(), 16);
    Ok(())
}

#[tokio::test]
async fn timeout_is_not_downgraded_by_later_errors() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let options =
        JobOptions::new(CONFIGURATION, dir.path()).with_timeout(Some(Duration::from_secs(1)));
    let mut job = Job::new(options)?;

    job.register(TaskSpec::new("slow", "sleep 5"));
    let _ = with_timeout(job.run()).await;

    let _ = job.error("late failure");
    assert_eq!(job.status(), JobStatus::Timeout);
    assert_eq!(job.finalize(), 8);

    let marker = read_marker(job.work_dir(), "TIMEOUT").expect("TIMEOUT marker");
    assert!(marker.starts_with("Reached TIMEOUT (1 seconds)"));
    assert!(!marker.contains("late failure"));
    assert!(read_marker(job.work_dir(), "ERROR").is_none());
    assert!(log_messages(job.work_dir()).contains(&"ERROR: late failure".to_string()));
    Ok(())
}
