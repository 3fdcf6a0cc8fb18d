// src/engine/mod.rs

//! Job execution engine.
//!
//! - [`job`] is the scheduler: task registration, the cooperative poll loop,
//!   timeout, cascade termination and the final report.
//! - [`abort`] is the sentinel returned once a fatal status is recorded.
//! - [`journal`] owns `logfile.txt` and the status marker file.
//! - [`summary`] formats elapsed clock and process time.
//! - [`interrupt`] forwards operator signals to the owning job.

pub mod abort;
pub mod interrupt;
pub mod job;
pub mod journal;
pub mod summary;

pub use abort::Abort;
pub use interrupt::{spawn_signal_listener, InterruptHandle};
pub use job::{Job, JobOptions, MAX_WAIT};
pub use journal::{Journal, LOG_FILE_NAME};
