// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{FlowError, Result};
use crate::exec::COMMAND_NOT_FOUND;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = FlowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let order = validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task, order))
    }
}

/// Check a raw config and return its task names in dependency order.
pub fn validate_config(cfg: &RawConfigFile) -> Result<Vec<String>> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_fields(cfg)?;
    validate_task_dependencies(cfg)?;
    dependency_order(cfg)
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(FlowError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    let name = &cfg.config.configuration;
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(FlowError::ConfigError(format!(
            "[config].configuration must be a plain directory name (got {name:?})"
        )));
    }

    if cfg.config.timeout == Some(0) {
        return Err(FlowError::ConfigError(
            "[config].timeout must be >= 1 second (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_task_fields(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.cmd.trim().is_empty() {
            return Err(FlowError::ConfigError(format!(
                "task '{name}' has an empty `cmd`"
            )));
        }

        if !task.inputs.is_empty() && task.output.is_none() {
            return Err(FlowError::ConfigError(format!(
                "task '{name}' declares `inputs` but no `output`"
            )));
        }

        if task.ok_exit_codes.is_empty() {
            return Err(FlowError::ConfigError(format!(
                "task '{name}' has an empty `ok_exit_codes`"
            )));
        }

        if task.ok_exit_codes.contains(&COMMAND_NOT_FOUND) {
            return Err(FlowError::ConfigError(format!(
                "task '{name}' cannot accept exit code {COMMAND_NOT_FOUND} (command not found)"
            )));
        }

        if let Some(pattern) = &task.quiet {
            Regex::new(pattern)?;
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(FlowError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(FlowError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn dependency_order(cfg: &RawConfigFile) -> Result<Vec<String>> {
    // Edge direction: dep -> task, so `[task.B] after = ["A"]` adds A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(FlowError::DagCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{ConfigSection, TaskConfig};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn raw(tasks: Vec<(&str, TaskConfig)>) -> RawConfigFile {
        RawConfigFile {
            config: ConfigSection::default(),
            task: tasks
                .into_iter()
                .map(|(n, t)| (n.to_string(), t))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn after(cmd: &str, deps: &[&str]) -> TaskConfig {
        let mut t = TaskConfig::new(cmd);
        t.after = deps.iter().map(|d| d.to_string()).collect();
        t
    }

    #[test]
    fn order_puts_dependencies_first() {
        let cfg = ConfigFile::try_from(raw(vec![
            ("pack", after("icepack", &["pnr"])),
            ("pnr", after("nextpnr", &["synth"])),
            ("synth", after("yosys", &[])),
        ]))
        .unwrap();
        assert_eq!(cfg.task_order(), &["synth", "pnr", "pack"]);
    }

    #[test]
    fn empty_config_is_rejected() {
        let err = ConfigFile::try_from(raw(vec![])).unwrap_err();
        assert!(matches!(err, FlowError::ConfigError(_)));
    }

    #[test]
    fn inputs_without_output_are_rejected() {
        let mut t = TaskConfig::new("yosys");
        t.inputs = vec![PathBuf::from("top.v")];
        let err = ConfigFile::try_from(raw(vec![("synth", t)])).unwrap_err();
        assert!(err.to_string().contains("no `output`"));
    }

    #[test]
    fn accepting_127_is_rejected() {
        let mut t = TaskConfig::new("yosys");
        t.ok_exit_codes = vec![0, 127];
        assert!(ConfigFile::try_from(raw(vec![("synth", t)])).is_err());
    }

    #[test]
    fn bad_quiet_pattern_is_rejected() {
        let mut t = TaskConfig::new("yosys");
        t.quiet = Some("(".to_string());
        let err = ConfigFile::try_from(raw(vec![("synth", t)])).unwrap_err();
        assert!(matches!(err, FlowError::InvalidPattern(_)));
    }

    #[test]
    fn self_dependency_is_rejected() {
        let err = ConfigFile::try_from(raw(vec![("a", after("true", &["a"]))])).unwrap_err();
        assert!(err.to_string().contains("itself"));
    }

    #[test]
    fn zero_timeout_and_nested_configuration_are_rejected() {
        let mut cfg = raw(vec![("a", TaskConfig::new("true"))]);
        cfg.config.timeout = Some(0);
        assert!(ConfigFile::try_from(cfg).is_err());

        let mut cfg = raw(vec![("a", TaskConfig::new("true"))]);
        cfg.config.configuration = "../escape".to_string();
        assert!(ConfigFile::try_from(cfg).is_err());
    }
}
