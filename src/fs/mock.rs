// src/fs/mock.rs

use super::FileSystem;
use anyhow::Result;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

/// In-memory filesystem that only tracks which files exist and when they were
/// last modified.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, SystemTime>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update `path` with a modification time `secs` seconds after
    /// the Unix epoch.
    pub fn set_mtime(&self, path: impl AsRef<Path>, secs: u64) {
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
        self.entries().insert(path.as_ref().to_path_buf(), mtime);
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        self.entries().remove(path.as_ref());
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, SystemTime>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.entries().contains_key(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.entries().get(path).copied().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("File not found: {:?}", path))
        })
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.entries().retain(|p, _| !p.starts_with(path));
        Ok(())
    }
}
