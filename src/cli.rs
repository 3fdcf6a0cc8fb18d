// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `fpga-flow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fpga-flow",
    version,
    about = "Run FPGA synthesis, place-and-route and packing as a dependency graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the build description (TOML).
    ///
    /// Default: `Fpgaflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FPGA_FLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run every out-of-date step.
    Build(BuildArgs),
    /// Remove the configuration's work directory.
    Clean(CleanArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct BuildArgs {
    /// Configuration name; overrides `[config].configuration`.
    #[arg(long, value_name = "NAME")]
    pub configuration: Option<String>,

    /// Job timeout in seconds; overrides `[config].timeout`.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Parse + validate, print the plan, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct CleanArgs {
    #[arg(long, value_name = "NAME")]
    pub configuration: Option<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
