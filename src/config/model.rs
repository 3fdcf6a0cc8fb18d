// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level build description as read from a TOML file.
///
/// ```toml
/// [config]
/// configuration = "default"
/// timeout = 600
///
/// [task.synth]
/// cmd = "yosys .fpga/default/script.ys -q"
/// inputs = ["top.v"]
/// output = ".fpga/default/output.json"
/// requires = ["yosys"]
///
/// [task.pnr]
/// cmd = "nextpnr-ice40 --up5k --json .fpga/default/output.json --asc .fpga/default/output.asc"
/// after = ["synth"]
/// ```
///
/// This is the unvalidated form; use [`ConfigFile`] everywhere else.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Keys are task names.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, which guarantees known
/// and acyclic dependencies and well-formed task fields.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
    /// Task names ordered so that every task follows its dependencies.
    order: Vec<String>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        task: BTreeMap<String, TaskConfig>,
        order: Vec<String>,
    ) -> Self {
        Self {
            config,
            task,
            order,
        }
    }

    /// Task names in dependency order.
    pub fn task_order(&self) -> &[String] {
        &self.order
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Configuration name; the job's work directory is
    /// `<work_root>/<configuration>`.
    #[serde(default = "default_configuration")]
    pub configuration: String,

    #[serde(default = "default_work_root")]
    pub work_root: PathBuf,

    /// Job wall-clock ceiling in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
}

fn default_configuration() -> String {
    "default".to_string()
}

fn default_work_root() -> PathBuf {
    PathBuf::from(".fpga")
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            configuration: default_configuration(),
            work_root: default_work_root(),
            timeout: None,
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Shell command line, executed as-is.
    pub cmd: String,

    /// Tasks that must finish before this one starts.
    #[serde(default)]
    pub after: Vec<String>,

    /// Files whose modification times decide whether `output` is stale.
    #[serde(default)]
    pub inputs: Vec<PathBuf>,

    /// Artifact produced by the command. With it, the task is skipped while
    /// the artifact is newer than every input.
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Executables that must be on `PATH` before anything runs.
    #[serde(default)]
    pub requires: Vec<String>,

    /// Raw output copy, relative to the work directory.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub capture_stderr: bool,

    #[serde(default)]
    pub silent: bool,

    /// Regex; matching output lines are not logged.
    #[serde(default)]
    pub quiet: Option<String>,

    #[serde(default = "default_ok_exit_codes")]
    pub ok_exit_codes: Vec<i32>,

    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_ok_exit_codes() -> Vec<i32> {
    vec![0]
}

impl TaskConfig {
    /// A task with only a command; every other field at its default.
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            after: Vec::new(),
            inputs: Vec::new(),
            output: None,
            requires: Vec::new(),
            log_file: None,
            capture_stderr: true,
            silent: false,
            quiet: None,
            ok_exit_codes: default_ok_exit_codes(),
            cwd: None,
        }
    }
}
