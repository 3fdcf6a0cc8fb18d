// src/engine/job.rs

//! The job: one scheduler per build invocation.
//!
//! A single loop multiplexes every running process. Each tick it waits for
//! output from any task (bounded by [`MAX_WAIT`] so the timeout is re-checked
//! even when nothing prints), polls running tasks, then polls pending ones.
//! A task that finishes polls its own successors in the same tick, so a
//! dependency chain advances without sweeping the whole graph.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::dag::{TaskGraph, TaskId, TaskNode, TaskSpec, TaskState};
use crate::errors::{FlowError, Result};
use crate::exec::{ProcessSupervisor, COMMAND_NOT_FOUND};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::JobStatus;

use super::abort::Abort;
use super::interrupt::InterruptHandle;
use super::journal::Journal;
use super::summary::{children_cpu_time, elapsed_lines};

/// Upper bound on one wait for process output.
pub const MAX_WAIT: Duration = Duration::from_secs(1);

/// Wait used while a process has exited or closed its pipe, but not both.
const SETTLE_TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Configuration name; also the work directory name under `work_root`.
    pub configuration: String,
    pub work_root: PathBuf,
    /// Ceiling on total wall-clock run time.
    pub timeout: Option<Duration>,
}

impl JobOptions {
    pub fn new(configuration: impl Into<String>, work_root: impl Into<PathBuf>) -> Self {
        Self {
            configuration: configuration.into(),
            work_root: work_root.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_root.join(&self.configuration)
    }
}

#[derive(Debug)]
pub struct Job {
    graph: TaskGraph,
    /// Registered but not started, in registration order.
    pending: Vec<TaskId>,
    running: Vec<TaskId>,
    status: JobStatus,
    started: Instant,
    start_process_time: Option<Duration>,
    timeout: Option<Duration>,
    journal: Journal,
    fs: Arc<dyn FileSystem>,
    wake: Arc<Notify>,
    interrupt: InterruptHandle,
    exit_code: Option<i32>,
}

impl Job {
    pub fn new(options: JobOptions) -> Result<Self> {
        Self::with_fs(options, Arc::new(RealFileSystem))
    }

    /// Like [`Job::new`] but with the filesystem used for staleness checks.
    pub fn with_fs(options: JobOptions, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let journal = Journal::open(&options.work_dir(), &options.configuration)?;
        let wake = Arc::new(Notify::new());
        let interrupt = InterruptHandle::new(wake.clone());

        Ok(Self {
            graph: TaskGraph::new(),
            pending: Vec::new(),
            running: Vec::new(),
            status: JobStatus::Ok,
            started: Instant::now(),
            start_process_time: children_cpu_time(),
            timeout: options.timeout,
            journal,
            fs,
            wake,
            interrupt,
            exit_code: None,
        })
    }

    /// Add a build step. Its dependencies must already be registered.
    pub fn register(&mut self, spec: TaskSpec) -> TaskId {
        let id = self.graph.add(spec);
        self.pending.push(id);
        id
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn task_state(&self, id: TaskId) -> TaskState {
        self.graph.state(id)
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn work_dir(&self) -> &Path {
        self.journal.dir()
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub fn log(&mut self, message: &str) {
        self.journal.info(message);
    }

    pub fn warning(&mut self, message: &str) {
        self.journal.warning(message);
    }

    /// Record a fatal error: status `ERROR`, cascade termination, status
    /// marker. The returned [`Abort`] should be propagated with `?`.
    pub fn error(&mut self, message: &str) -> Abort {
        self.escalate(JobStatus::Error, message.to_string())
    }

    /// Run until no task is running.
    ///
    /// Tasks still pending afterwards can never start: one of their
    /// dependencies failed or was terminated.
    pub async fn run(&mut self) -> std::result::Result<(), Abort> {
        self.check_interrupt()?;

        for id in self.pending.clone() {
            self.poll_task(id)?;
        }

        while !self.running.is_empty() {
            self.wait_for_activity().await;
            self.check_interrupt()?;

            for id in self.running.clone() {
                self.poll_task(id)?;
            }
            for id in self.pending.clone() {
                self.poll_task(id)?;
            }

            if let Some(limit) = self.timeout {
                if self.started.elapsed() > limit {
                    let message = format!(
                        "Reached TIMEOUT ({} seconds). Terminating all tasks.",
                        limit.as_secs()
                    );
                    return Err(self.escalate(JobStatus::Timeout, message));
                }
            }
        }

        if !self.pending.is_empty() {
            let names: Vec<&str> = self.pending.iter().map(|id| self.graph.name(*id)).collect();
            debug!(?names, "tasks left pending; their dependencies never finished");
        }

        Ok(())
    }

    /// Terminate every running task without waiting for it to exit.
    pub fn terminate(&mut self) {
        for id in std::mem::take(&mut self.running) {
            let node = self.graph.node_mut(id);
            let name = node.spec.name.clone();
            let silent = node.spec.silent;

            if let Some(process) = node.process.as_mut() {
                process.terminate();
            }
            close_task_log(node);
            self.graph.advance(id, TaskState::Terminated);

            if !silent {
                self.journal.info(&format!("{name}: terminating process"));
            }
        }
    }

    /// Emit the summary and return the process exit code.
    ///
    /// Only the first call reports; later calls return the same code.
    pub fn finalize(&mut self) -> i32 {
        if let Some(code) = self.exit_code {
            debug!(code, "job already finalized");
            return code;
        }

        let process = match (self.start_process_time, children_cpu_time()) {
            (Some(start), Some(now)) => Some(now.saturating_sub(start)),
            _ => None,
        };
        let mut lines = elapsed_lines(self.started.elapsed(), process);
        lines.extend(self.graph.ids().map(|id| task_summary(self.graph.node(id))));

        for line in &lines {
            self.journal.info(&format!("summary: {line}"));
        }

        let code = self.status.exit_code();
        self.journal.info(&format!("DONE ({}, rc={})", self.status, code));
        self.exit_code = Some(code);
        code
    }

    fn check_interrupt(&mut self) -> std::result::Result<(), Abort> {
        if self.interrupt.is_requested() {
            let message = "Keyboard interrupt or external termination signal".to_string();
            return Err(self.escalate(JobStatus::Error, message));
        }
        Ok(())
    }

    async fn wait_for_activity(&self) {
        let settling = self.running.iter().any(|id| {
            self.graph
                .node(*id)
                .process
                .as_ref()
                .is_some_and(|p| p.is_settling())
        });
        let tick = if settling { SETTLE_TICK } else { MAX_WAIT };
        let _ = tokio::time::timeout(tick, self.wake.notified()).await;
    }

    fn poll_task(&mut self, id: TaskId) -> std::result::Result<(), Abort> {
        match self.graph.state(id) {
            TaskState::Pending => self.try_start(id),
            TaskState::Running => self.poll_running(id),
            TaskState::Finished | TaskState::Failed | TaskState::Terminated => Ok(()),
        }
    }

    fn try_start(&mut self, id: TaskId) -> std::result::Result<(), Abort> {
        if !self.status.is_ok() || !self.graph.deps_finished(id) {
            return Ok(());
        }

        let spec = self.graph.node(id).spec.clone();
        let name = spec.name.as_str();

        if let Some(freshness) = &spec.freshness {
            match freshness.needs_rebuild(self.fs.as_ref()) {
                Ok(true) => {}
                Ok(false) => {
                    self.journal.info(&format!("{name}: up to date, skipping"));
                    self.graph.node_mut(id).up_to_date = true;
                    self.graph.advance(id, TaskState::Finished);
                    self.pending.retain(|p| *p != id);
                    return self.notify_successors(id);
                }
                Err(e) => {
                    self.graph.advance(id, TaskState::Failed);
                    self.pending.retain(|p| *p != id);
                    return Err(self.error(&format!("{name}: cannot check staleness: {e}")));
                }
            }
        }

        if !spec.silent {
            self.journal
                .info(&format!("{name}: starting process \"{}\"", spec.cmdline));
        }

        let log = match &spec.log_file {
            Some(path) => match open_task_log(&self.journal.dir().join(path)) {
                Ok(file) => Some(file),
                Err(e) => {
                    self.graph.advance(id, TaskState::Failed);
                    self.pending.retain(|p| *p != id);
                    return Err(self.error(&format!("{name}: {e}")));
                }
            },
            None => None,
        };

        let process = match ProcessSupervisor::start(&spec.cmdline, &spec.spawn, self.wake.clone()) {
            Ok(p) => p,
            Err(source) => {
                self.graph.advance(id, TaskState::Failed);
                self.pending.retain(|p| *p != id);
                let err = FlowError::Spawn {
                    task: spec.name.clone(),
                    source,
                };
                return Err(self.error(&err.to_string()));
            }
        };
        debug!(task = %name, pid = ?process.pid(), "task running");

        let node = self.graph.node_mut(id);
        node.process = Some(process);
        node.log = log;
        self.graph.advance(id, TaskState::Running);
        self.pending.retain(|p| *p != id);
        self.running.push(id);
        Ok(())
    }

    fn poll_running(&mut self, id: TaskId) -> std::result::Result<(), Abort> {
        let lines = match self.graph.node_mut(id).process.as_mut() {
            Some(p) => p.read_available(),
            None => Vec::new(),
        };
        for line in lines {
            self.handle_output(id, &line);
        }

        let Some(code) = self
            .graph
            .node_mut(id)
            .process
            .as_mut()
            .and_then(|p| p.poll_exit())
        else {
            return Ok(());
        };

        let node = self.graph.node_mut(id);
        node.exit_code = Some(code);
        close_task_log(node);
        let name = node.spec.name.clone();
        let silent = node.spec.silent;
        let accepted = node.spec.accepts(code);
        self.running.retain(|r| *r != id);

        if !silent {
            self.journal
                .info(&format!("{name}: finished (returncode={code})"));
        }

        if code == COMMAND_NOT_FOUND {
            self.graph.advance(id, TaskState::Failed);
            return Err(self.error(&format!("{name}: COMMAND NOT FOUND. ERROR.")));
        }

        if !accepted {
            self.graph.advance(id, TaskState::Failed);
            return Err(self.error(&format!("{name}: job failed (returncode={code}). ERROR.")));
        }

        self.graph.advance(id, TaskState::Finished);
        self.notify_successors(id)
    }

    fn handle_output(&mut self, id: TaskId, line: &str) {
        let node = self.graph.node_mut(id);
        if node.process.as_ref().is_some_and(|p| p.is_terminated()) {
            return;
        }
        if node.spec.is_quiet(line) {
            return;
        }

        if let Some(log) = node.log.as_mut() {
            if let Err(e) = writeln!(log, "{line}") {
                warn!(task = %node.spec.name, error = %e, "failed to write task log");
            }
        }

        let name = node.spec.name.clone();
        self.journal.task_line(&name, line);
    }

    fn notify_successors(&mut self, id: TaskId) -> std::result::Result<(), Abort> {
        for succ in self.graph.successors_of(id).to_vec() {
            self.poll_task(succ)?;
        }
        Ok(())
    }

    fn escalate(&mut self, status: JobStatus, message: String) -> Abort {
        match status {
            JobStatus::Timeout => self.journal.info(&message),
            _ => self.journal.error(&message),
        }

        // The marker keeps the message of the first degradation.
        let first = self.status.is_ok();
        if first {
            self.status = status;
        }
        self.terminate();

        if first {
            if let Err(e) = self.journal.write_marker(self.status, &message) {
                warn!(error = %e, "failed to write status marker");
            }
        }

        Abort::new(self.status, message)
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        if !self.running.is_empty() {
            self.terminate();
        }
    }
}

fn open_task_log(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| {
        FlowError::ConfigError(format!("cannot open task log {:?}: {e}", path))
    })?;
    Ok(BufWriter::new(file))
}

fn close_task_log(node: &mut TaskNode) {
    if let Some(mut log) = node.log.take() {
        if let Err(e) = log.flush() {
            warn!(task = %node.spec.name, error = %e, "failed to flush task log");
        }
    }
}

fn task_summary(node: &TaskNode) -> String {
    let outcome = match (node.state, node.exit_code) {
        (TaskState::Finished, _) if node.up_to_date => "up to date".to_string(),
        (TaskState::Finished, Some(code)) => format!("finished (returncode={code})"),
        (TaskState::Finished, None) => "finished".to_string(),
        (TaskState::Failed, Some(code)) => format!("failed (returncode={code})"),
        (TaskState::Failed, None) => "failed to start".to_string(),
        (TaskState::Terminated, _) => "terminated".to_string(),
        (TaskState::Running, _) => "running".to_string(),
        (TaskState::Pending, _) => "not started".to_string(),
    };
    format!("{}: {}", node.spec.name, outcome)
}
