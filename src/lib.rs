// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod stale;
pub mod types;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::build::BuildPlan;
use crate::cli::{BuildArgs, CleanArgs, CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{spawn_signal_listener, Job, JobOptions};
use crate::fs::RealFileSystem;

/// High-level entry point used by `main.rs`.
///
/// Returns the process exit code: the job's 0/8/16 for `build`, 0 for a
/// successful `clean`. Configuration and setup failures come back as `Err`.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let root = config_root_dir(&config_path);

    match args.command {
        Command::Build(build) => run_build(&cfg, &root, build).await,
        Command::Clean(clean) => run_clean(&cfg, &root, clean),
    }
}

async fn run_build(cfg: &ConfigFile, root: &Path, args: BuildArgs) -> Result<i32> {
    let plan = BuildPlan::from_config(cfg, root)?;
    let options = job_options(cfg, root, args.configuration)
        .with_timeout(args.timeout.or(cfg.config.timeout).map(Duration::from_secs));

    if args.dry_run {
        plan.print(&options.configuration, &options.work_dir());
        return Ok(0);
    }

    let mut job = Job::new(options)?;
    let listener = spawn_signal_listener(job.interrupt_handle());

    if let Err(abort) = plan.execute(&mut job).await {
        // Already logged, marked and cascaded by the job.
        debug!(status = %abort.status(), message = abort.message(), "build aborted");
    }
    listener.abort();

    Ok(job.finalize())
}

fn run_clean(cfg: &ConfigFile, root: &Path, args: CleanArgs) -> Result<i32> {
    let options = job_options(cfg, root, args.configuration);
    crate::build::clean(&RealFileSystem, &options.work_dir())?;
    info!(configuration = %options.configuration, "clean complete");
    Ok(0)
}

fn job_options(cfg: &ConfigFile, root: &Path, configuration: Option<String>) -> JobOptions {
    let configuration = configuration.unwrap_or_else(|| cfg.config.configuration.clone());
    JobOptions::new(configuration, root.join(&cfg.config.work_root))
}

/// Directory that relative paths in the config resolve against.
///
/// - If the config path has a non-empty parent (e.g. "hw/Fpgaflow.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Fpgaflow.toml" (parent = ""),
///   we fall back to the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
