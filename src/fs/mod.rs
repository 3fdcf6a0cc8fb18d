// src/fs/mod.rs

//! Filesystem seam used by the staleness checker and the clean command.
//!
//! Production code uses [`RealFileSystem`]; unit tests use
//! [`mock::MockFileSystem`] to control modification times precisely instead of
//! sleeping until a coarse filesystem clock ticks over.

use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn exists(&self, path: &Path) -> bool;

    /// Last modification time of `path`.
    ///
    /// Returns the raw `io::Error` so callers can tell a missing file
    /// (`ErrorKind::NotFound`) from other failures.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Recursively remove a directory. Removing a missing directory is not an
    /// error.
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing directory {:?}", path)),
        }
    }
}
