// tests/build_cli.rs
#![cfg(unix)]

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use common::TestResult;
use fpga_flow::cli::{BuildArgs, CleanArgs, CliArgs, Command};
use fpga_flow::run;
use fpga_flow_test_utils::{init_tracing, log_messages, read_marker, with_timeout};
use tempfile::{tempdir, TempDir};

fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("Fpgaflow.toml");
    fs::write(&path, contents).unwrap();
    path
}

fn build(config: &Path, args: BuildArgs) -> CliArgs {
    CliArgs {
        config: config.to_path_buf(),
        log_level: None,
        command: Command::Build(args),
    }
}

fn work_dir(dir: &TempDir, configuration: &str) -> PathBuf {
    dir.path().join(".fpga").join(configuration)
}

const FLOW: &str = r#"
[task.synth]
cmd = "echo json > synth.out"
requires = ["sh"]

[task.pnr]
cmd = "cat synth.out > pnr.out"
after = ["synth"]
log_file = "pnr.log"
"#;

#[tokio::test]
async fn build_runs_in_the_config_directory() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = write_config(&dir, FLOW);

    let code = with_timeout(run(build(&config, BuildArgs::default()))).await?;
    assert_eq!(code, 0);

    assert_eq!(fs::read_to_string(dir.path().join("pnr.out"))?, "json\n");

    let log = log_messages(&work_dir(&dir, "default"));
    assert!(log.contains(&"synth: finished (returncode=0)".to_string()));
    assert_eq!(log.last().map(String::as_str), Some("DONE (OK, rc=0)"));
    Ok(())
}

#[tokio::test]
async fn configuration_override_selects_work_dir() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = write_config(&dir, FLOW);

    let args = BuildArgs {
        configuration: Some("release".to_string()),
        ..BuildArgs::default()
    };
    assert_eq!(with_timeout(run(build(&config, args))).await?, 0);

    assert!(work_dir(&dir, "release").join("logfile.txt").exists());
    assert!(!work_dir(&dir, "default").exists());
    Ok(())
}

#[tokio::test]
async fn missing_tool_fails_before_any_task() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = write_config(
        &dir,
        r#"
[task.synth]
cmd = "touch ran.txt"
requires = ["fpga-flow-no-such-tool"]
"#,
    );

    let code = with_timeout(run(build(&config, BuildArgs::default()))).await?;
    assert_eq!(code, 16);
    assert!(!dir.path().join("ran.txt").exists());

    let work = work_dir(&dir, "default");
    let log = log_messages(&work);
    assert!(log.contains(
        &"ERROR: Executable for fpga-flow-no-such-tool not available, install".to_string()
    ));
    assert!(read_marker(&work, "ERROR").is_some());
    Ok(())
}

#[tokio::test]
async fn timeout_flag_overrides_config() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = write_config(
        &dir,
        r#"
[config]
timeout = 600

[task.slow]
cmd = "sleep 5"
"#,
    );

    let args = BuildArgs {
        timeout: Some(1),
        ..BuildArgs::default()
    };
    assert_eq!(with_timeout(run(build(&config, args))).await?, 8);
    Ok(())
}

#[tokio::test]
async fn dry_run_executes_nothing() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = write_config(&dir, FLOW);

    let args = BuildArgs {
        dry_run: true,
        ..BuildArgs::default()
    };
    assert_eq!(with_timeout(run(build(&config, args))).await?, 0);

    assert!(!dir.path().join("synth.out").exists());
    assert!(!dir.path().join(".fpga").exists());
    Ok(())
}

#[tokio::test]
async fn clean_removes_the_work_dir() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = write_config(&dir, FLOW);

    assert_eq!(with_timeout(run(build(&config, BuildArgs::default()))).await?, 0);
    let work = work_dir(&dir, "default");
    assert!(work.join("pnr.log").exists());

    let clean = CliArgs {
        config: config.clone(),
        log_level: None,
        command: Command::Clean(CleanArgs::default()),
    };
    assert_eq!(run(clean).await?, 0);
    assert!(!work.exists());
    assert!(Path::new(&dir.path().join("pnr.out")).exists());
    Ok(())
}

#[tokio::test]
async fn invalid_config_is_an_error() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = write_config(
        &dir,
        r#"
[task.synth]
cmd = "true"
inputs = ["top.v"]
"#,
    );

    let err = run(build(&config, BuildArgs::default())).await.unwrap_err();
    assert!(format!("{err:#}").contains("no `output`"));
    Ok(())
}
