//! Advisory lock serializing mutating operations across processes

use crate::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Exclusive lock on the state directory's lock file.
///
/// Held for the whole of a mutating command so the config store, the port
/// registry and the external service/firewall state are only changed by one
/// invocation at a time. Released when dropped.
#[derive(Debug)]
pub struct OperationLock {
    file: File,
    path: PathBuf,
}

impl OperationLock {
    /// Take the lock without waiting; fails if another process holds it
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if let Err(e) = FileExt::try_lock_exclusive(&file) {
            log::debug!("Lock acquisition on {} failed: {}", path.display(), e);
            let owner = fs::read_to_string(path).unwrap_or_default();
            let owner = owner.trim();
            return Err(Error::conflict(if owner.is_empty() {
                "another ss-manager operation is in progress".to_string()
            } else {
                format!("another ss-manager operation (pid {}) is in progress", owner)
            }));
        }

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        log::debug!("Acquired operation lock {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for OperationLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}
