// tests/build_plan.rs
#![cfg(unix)]

mod common;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use common::TestResult;
use fpga_flow::build::BuildPlan;
use fpga_flow::config::ConfigFile;
use fpga_flow::engine::{Job, JobOptions};
use fpga_flow::errors::FlowError;
use fpga_flow::types::JobStatus;
use fpga_flow_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use fpga_flow_test_utils::{init_tracing, log_messages, read_marker, with_timeout};
use tempfile::tempdir;

fn job_for(cfg: &ConfigFile, root: &Path) -> Job {
    let options = JobOptions::new(
        cfg.config.configuration.clone(),
        root.join(&cfg.config.work_root),
    )
    .with_timeout(cfg.config.timeout.map(Duration::from_secs));
    Job::new(options).expect("open job work dir")
}

fn age(path: &Path, secs: u64) -> TestResult {
    let mtime = SystemTime::now() - Duration::from_secs(secs);
    File::options().write(true).open(path)?.set_modified(mtime)?;
    Ok(())
}

fn ice40_flow() -> ConfigFile {
    ConfigFileBuilder::new()
        .configuration("up5k")
        .work_root("build")
        .with_task(
            "synth",
            TaskConfigBuilder::new("echo 'Info: reading top.v'; echo json > top.json")
                .input("top.v")
                .output("top.json")
                .requires("sh")
                .quiet("^Info:")
                .build(),
        )
        .with_task(
            "pnr",
            TaskConfigBuilder::new("echo placed; cat top.json > top.asc; exit 2")
                .after("synth")
                .input("top.json")
                .output("top.asc")
                .ok_exit_codes(&[0, 2])
                .log_file("pnr.log")
                .build(),
        )
        .with_task(
            "pack",
            TaskConfigBuilder::new("cp top.asc top.bin")
                .after("pnr")
                .silent(true)
                .build(),
        )
        .build()
}

#[tokio::test]
async fn plan_runs_every_step_with_its_options() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    fs::write(dir.path().join("top.v"), "module top; endmodule\n")?;

    let cfg = ice40_flow();
    let plan = BuildPlan::from_config(&cfg, dir.path())?;
    let mut job = job_for(&cfg, dir.path());

    with_timeout(plan.execute(&mut job)).await?;
    assert_eq!(job.finalize(), 0);

    let work = dir.path().join("build").join("up5k");
    assert_eq!(job.work_dir(), work.as_path());
    assert_eq!(fs::read_to_string(dir.path().join("top.bin"))?, "json\n");
    assert_eq!(fs::read_to_string(work.join("pnr.log"))?, "placed\n");

    let log = log_messages(&work);
    assert!(!log.iter().any(|l| l.contains("Info: reading")));
    assert!(log.contains(&"pnr: finished (returncode=2)".to_string()));
    assert!(!log.iter().any(|l| l.starts_with("pack: starting")));
    Ok(())
}

#[tokio::test]
async fn second_build_skips_up_to_date_steps() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    fs::write(dir.path().join("top.v"), "module top; endmodule\n")?;

    let cfg = ice40_flow();
    let plan = BuildPlan::from_config(&cfg, dir.path())?;

    let mut first = job_for(&cfg, dir.path());
    with_timeout(plan.execute(&mut first)).await?;
    assert_eq!(first.finalize(), 0);
    drop(first);

    age(&dir.path().join("top.v"), 100)?;
    age(&dir.path().join("top.json"), 50)?;

    let mut second = job_for(&cfg, dir.path());
    with_timeout(plan.execute(&mut second)).await?;
    assert_eq!(second.finalize(), 0);

    let log = log_messages(second.work_dir());
    assert!(log.contains(&"synth: up to date, skipping".to_string()));
    assert!(log.contains(&"pnr: up to date, skipping".to_string()));
    Ok(())
}

#[tokio::test]
async fn missing_tool_aborts_before_registration() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "synth",
            TaskConfigBuilder::new("touch ran.txt")
                .requires("fpga-flow-no-such-tool")
                .build(),
        )
        .build();
    let plan = BuildPlan::from_config(&cfg, dir.path())?;
    let mut job = job_for(&cfg, dir.path());

    let abort = with_timeout(plan.execute(&mut job)).await.unwrap_err();
    assert_eq!(abort.status(), JobStatus::Error);
    assert!(job.graph().is_empty());
    assert!(!dir.path().join("ran.txt").exists());
    assert!(read_marker(job.work_dir(), "ERROR").is_some());
    Ok(())
}

#[tokio::test]
async fn configured_timeout_applies_to_the_plan() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let cfg = ConfigFileBuilder::new()
        .timeout(1)
        .with_task("slow", TaskConfigBuilder::new("sleep 5").build())
        .build();
    let plan = BuildPlan::from_config(&cfg, dir.path())?;
    let mut job = job_for(&cfg, dir.path());

    let abort = with_timeout(plan.execute(&mut job)).await.unwrap_err();
    assert_eq!(abort.status(), JobStatus::Timeout);
    assert_eq!(job.finalize(), 8);
    Ok(())
}

#[test]
fn builder_configs_go_through_validation() {
    let raw = ConfigFileBuilder::new()
        .with_task(
            "synth",
            TaskConfigBuilder::new("yosys").input(PathBuf::from("top.v")).build(),
        )
        .build_raw();

    match ConfigFile::try_from(raw) {
        Err(FlowError::ConfigError(msg)) => assert!(msg.contains("no `output`")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}
