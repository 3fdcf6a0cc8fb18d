// src/build/mod.rs

//! Turns a validated [`ConfigFile`] into registered job tasks.
//!
//! Relative paths in the config resolve against the directory holding the
//! config file, and commands run there unless a task sets `cwd`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};

use crate::config::{ConfigFile, TaskConfig};
use crate::dag::{TaskId, TaskSpec};
use crate::engine::{Abort, Job};
use crate::errors::Result;
use crate::exec::shell::platform_cmdline;
use crate::fs::FileSystem;
use crate::stale::Freshness;
use crate::types::TaskName;

/// One step of the plan, with every path already resolved.
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub name: TaskName,
    pub after: Vec<TaskName>,
    pub cmdline: String,
    pub requires: Vec<String>,
    pub freshness: Option<Freshness>,
    pub log_file: Option<PathBuf>,
    pub cwd: PathBuf,
    pub capture_stderr: bool,
    pub silent: bool,
    pub quiet: Option<Regex>,
    pub ok_exit_codes: Vec<i32>,
}

impl PlannedStep {
    fn from_config(name: &str, task: &TaskConfig, root: &Path) -> Result<Self> {
        let resolve = |p: &Path| root.join(p);

        let freshness = task.output.as_deref().map(|output| {
            Freshness::new(
                task.inputs.iter().map(|p| resolve(p)).collect(),
                resolve(output),
            )
        });

        let quiet = match &task.quiet {
            Some(pattern) => Some(Regex::new(pattern)?),
            None => None,
        };

        Ok(Self {
            name: name.to_string(),
            after: task.after.clone(),
            cmdline: platform_cmdline(&task.cmd),
            requires: task.requires.clone(),
            freshness,
            log_file: task.log_file.clone(),
            cwd: task
                .cwd
                .as_deref()
                .map(resolve)
                .unwrap_or_else(|| root.to_path_buf()),
            capture_stderr: task.capture_stderr,
            silent: task.silent,
            quiet,
            ok_exit_codes: task.ok_exit_codes.clone(),
        })
    }

    fn to_spec(&self, ids: &HashMap<&str, TaskId>) -> TaskSpec {
        let mut spec = TaskSpec::new(self.name.clone(), self.cmdline.clone())
            .cwd(self.cwd.clone())
            .capture_stderr(self.capture_stderr)
            .silent(self.silent)
            .ok_exit_codes(self.ok_exit_codes.clone());

        for dep in &self.after {
            if let Some(id) = ids.get(dep.as_str()) {
                spec = spec.after(*id);
            }
        }
        if let Some(path) = &self.log_file {
            spec = spec.log_file(path.clone());
        }
        if let Some(re) = &self.quiet {
            spec = spec.quiet(re.clone());
        }
        if let Some(freshness) = &self.freshness {
            spec = spec.freshness(freshness.clone());
        }
        spec
    }
}

/// Steps in dependency order.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    steps: Vec<PlannedStep>,
}

impl BuildPlan {
    pub fn from_config(cfg: &ConfigFile, root: &Path) -> Result<Self> {
        let mut steps = Vec::with_capacity(cfg.task.len());
        for name in cfg.task_order() {
            if let Some(task) = cfg.task.get(name) {
                steps.push(PlannedStep::from_config(name, task, root)?);
            }
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    /// First required executable that `is_available` rejects.
    pub fn missing_tool(&self, is_available: impl Fn(&str) -> bool) -> Option<&str> {
        self.steps
            .iter()
            .flat_map(|s| s.requires.iter())
            .map(String::as_str)
            .find(|tool| !is_available(tool))
    }

    /// Register every step with `job`, dependencies first.
    pub fn register(&self, job: &mut Job) -> HashMap<TaskName, TaskId> {
        let mut ids: HashMap<&str, TaskId> = HashMap::with_capacity(self.steps.len());
        for step in &self.steps {
            let id = job.register(step.to_spec(&ids));
            ids.insert(step.name.as_str(), id);
        }
        ids.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    /// Check tools, register the steps and run the job to completion.
    pub async fn execute(&self, job: &mut Job) -> std::result::Result<(), Abort> {
        if let Some(tool) = self.missing_tool(tool_on_path) {
            return Err(job.error(&format!("Executable for {tool} not available, install")));
        }
        self.register(job);
        job.run().await
    }

    /// Print the plan without running anything.
    pub fn print(&self, configuration: &str, work_dir: &Path) {
        println!("fpga-flow dry-run");
        println!("  configuration = {configuration}");
        println!("  work_dir = {}", work_dir.display());
        println!();

        println!("tasks ({}):", self.steps.len());
        for step in &self.steps {
            println!("  - {}", step.name);
            println!("      cmd: {}", step.cmdline);
            if !step.after.is_empty() {
                println!("      after: {:?}", step.after);
            }
            if let Some(f) = &step.freshness {
                println!("      inputs: {:?}", f.inputs);
                println!("      output: {}", f.output.display());
            }
            if !step.requires.is_empty() {
                println!("      requires: {:?}", step.requires);
            }
            if step.ok_exit_codes != [0] {
                println!("      ok_exit_codes: {:?}", step.ok_exit_codes);
            }
        }

        debug!("dry-run complete (no execution)");
    }
}

fn tool_on_path(tool: &str) -> bool {
    which::which(tool).is_ok()
}

/// Remove a configuration's work directory.
pub fn clean(fs: &dyn FileSystem, work_dir: &Path) -> anyhow::Result<()> {
    if !fs.exists(work_dir) {
        info!(dir = ?work_dir, "nothing to clean");
        return Ok(());
    }
    fs.remove_dir_all(work_dir)?;
    info!(dir = ?work_dir, "removed work directory");
    Ok(())
}
