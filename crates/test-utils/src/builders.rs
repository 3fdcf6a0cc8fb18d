#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use fpga_flow::config::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn configuration(mut self, name: &str) -> Self {
        self.config.config.configuration = name.to_string();
        self
    }

    pub fn work_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.config.work_root = path.into();
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.config.config.timeout = Some(secs);
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig::new(cmd),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.task.inputs.push(path.into());
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.task.output = Some(path.into());
        self
    }

    pub fn requires(mut self, tool: &str) -> Self {
        self.task.requires.push(tool.to_string());
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.task.log_file = Some(path.into());
        self
    }

    pub fn silent(mut self, val: bool) -> Self {
        self.task.silent = val;
        self
    }

    pub fn quiet(mut self, pattern: &str) -> Self {
        self.task.quiet = Some(pattern.to_string());
        self
    }

    pub fn ok_exit_codes(mut self, codes: &[i32]) -> Self {
        self.task.ok_exit_codes = codes.to_vec();
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
