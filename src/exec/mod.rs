// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`supervisor`] owns one external process: spawn, non-blocking output
//!   draining, exit detection and forced termination.
//! - [`line_buffer`] turns raw output chunks into complete lines.
//! - [`shell`] builds the platform shell invocation and offers the
//!   `cmd.exe` operator translation for callers that need it.

pub mod line_buffer;
pub mod shell;
pub mod supervisor;

pub use line_buffer::LineBuffer;
pub use supervisor::{ProcessSupervisor, SpawnOptions, COMMAND_NOT_FOUND};
