// src/dag/task.rs

//! Task description, lifecycle state and per-task runtime data.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use regex::Regex;

use crate::exec::{ProcessSupervisor, SpawnOptions};
use crate::stale::Freshness;
use crate::types::TaskName;

/// Index of a task inside its [`TaskGraph`](super::TaskGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) usize);

/// Lifecycle of a task within one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Registered, waiting for its dependencies.
    Pending,
    /// Process spawned and being polled.
    Running,
    /// Exited with an accepted code, or skipped because its output was
    /// already up to date.
    Finished,
    /// Exited with a rejected code (including 127), or could not start.
    Failed,
    /// Killed before completion by a cascade, timeout or interrupt.
    Terminated,
}

impl TaskState {
    /// Whether `self -> to` is a legal lifecycle step.
    pub fn can_become(self, to: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, to),
            (Pending, Running)
                | (Pending, Finished)
                | (Pending, Failed)
                | (Running, Finished)
                | (Running, Failed)
                | (Running, Terminated)
        )
    }
}

/// Everything the driver declares about a build step.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    /// Short identifier used as log prefix.
    pub name: TaskName,
    pub deps: Vec<TaskId>,
    /// Opaque command line, run through the platform shell.
    pub cmdline: String,
    /// Raw output lines are copied here when set.
    pub log_file: Option<PathBuf>,
    pub spawn: SpawnOptions,
    /// Suppress "starting", "finished" and "terminating" lines.
    pub silent: bool,
    /// Output lines matching this pattern are not logged.
    pub quiet: Option<Regex>,
    /// Exit codes treated as success.
    pub ok_exit_codes: Vec<i32>,
    /// When set, the task is skipped if its output is newer than its inputs.
    pub freshness: Option<Freshness>,
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>, cmdline: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            cmdline: cmdline.into(),
            log_file: None,
            spawn: SpawnOptions::default(),
            silent: false,
            quiet: None,
            ok_exit_codes: vec![0],
            freshness: None,
        }
    }

    pub fn after(mut self, dep: TaskId) -> Self {
        self.deps.push(dep);
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spawn.cwd = Some(dir.into());
        self
    }

    pub fn capture_stderr(mut self, capture: bool) -> Self {
        self.spawn.capture_stderr = capture;
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn quiet(mut self, pattern: Regex) -> Self {
        self.quiet = Some(pattern);
        self
    }

    pub fn ok_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.ok_exit_codes = codes;
        self
    }

    pub fn freshness(mut self, freshness: Freshness) -> Self {
        self.freshness = Some(freshness);
        self
    }

    pub fn accepts(&self, exit_code: i32) -> bool {
        self.ok_exit_codes.contains(&exit_code)
    }

    pub fn is_quiet(&self, line: &str) -> bool {
        self.quiet.as_ref().is_some_and(|re| re.is_match(line))
    }
}

/// A registered task: its declaration plus the runtime data the job tracks.
#[derive(Debug)]
pub struct TaskNode {
    pub(crate) spec: TaskSpec,
    pub(crate) state: TaskState,
    /// Tasks that list this one as a dependency; polled when it finishes.
    pub(crate) successors: Vec<TaskId>,
    pub(crate) process: Option<ProcessSupervisor>,
    pub(crate) log: Option<BufWriter<File>>,
    pub(crate) up_to_date: bool,
    pub(crate) exit_code: Option<i32>,
}

impl TaskNode {
    pub(crate) fn new(spec: TaskSpec) -> Self {
        Self {
            spec,
            state: TaskState::Pending,
            successors: Vec::new(),
            process: None,
            log: None,
            up_to_date: false,
            exit_code: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Finished without running because its output was up to date.
    pub fn was_up_to_date(&self) -> bool {
        self.up_to_date
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}
