//! Console arbitration lock for concurrent generation jobs.
//!
//! At most one job at a time may stream its stage output live to the
//! operator's console; every other job writes silently to its files. The
//! lock is an OS exclusive lock on `<run_dir>/.console.lock`, so it
//! arbitrates between threads of one process and between independently
//! launched processes alike. The OS drops the lock when the holding file
//! descriptor closes, which includes a crashed or killed holder.
//!
//! The lock is advisory and only governs terminal visibility. It never
//! orders jobs or gates their results.
//!
//! ```rust,no_run
//! use boidfactory_lock::ConsoleLock;
//! use camino::Utf8Path;
//!
//! let mut lock = ConsoleLock::open(Utf8Path::new("runs/boids-20250101_120000"))?;
//! match lock.try_acquire(3, "qwen3:8b")? {
//!     Some(guard) => println!("job 3 streams live since {}", guard.holder().acquired_at),
//!     None => println!("job 3 writes to file only"),
//! }
//! # Ok::<(), boidfactory_lock::LockError>(())
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use fd_lock::{RwLock, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::process;

/// File name of the lock inside a run directory.
pub const LOCK_FILE_NAME: &str = ".console.lock";

/// Record written into the lock file by the current holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub job_index: u32,
    pub model: String,
    pub acquired_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Failed to open console lock at {path}: {source}")]
    Open {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Console lock operation failed: {0}")]
    Io(#[from] io::Error),

    #[error("Console lock holder record is unreadable: {reason}")]
    CorruptedHolder { reason: String },
}

/// One job's handle on the shared lock file.
///
/// Each job opens its own handle; OS file locks conflict between handles, not
/// only between processes.
pub struct ConsoleLock {
    path: Utf8PathBuf,
    file: RwLock<File>,
}

impl ConsoleLock {
    /// Open (creating if absent) the lock file inside `run_dir`.
    pub fn open(run_dir: &Utf8Path) -> Result<Self, LockError> {
        let path = run_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            file: RwLock::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Try to become the console holder without blocking.
    ///
    /// `Ok(None)` means another job holds the lock; that is the common case
    /// when more than one job runs and is not an error.
    pub fn try_acquire(
        &mut self,
        job_index: u32,
        model: &str,
    ) -> Result<Option<ConsoleGuard<'_>>, LockError> {
        let mut guard = match self.file.try_write() {
            Ok(guard) => guard,
            Err(e) if is_contended(&e) => return Ok(None),
            Err(e) => return Err(LockError::Io(e)),
        };

        let holder = LockHolder {
            pid: process::id(),
            job_index,
            model: model.to_string(),
            acquired_at: Utc::now(),
        };
        let json = serde_json::to_vec(&holder).map_err(|e| LockError::CorruptedHolder {
            reason: e.to_string(),
        })?;

        let file: &mut File = &mut guard;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&json)?;
        file.flush()?;

        Ok(Some(ConsoleGuard {
            guard: Some(guard),
            holder,
        }))
    }

    /// Read the current holder record, if any.
    ///
    /// The record is cleared on release, so an empty file means free. A
    /// holder that crashed may leave a stale record behind even though the
    /// OS lock itself is already free.
    pub fn read_holder(run_dir: &Utf8Path) -> Result<Option<LockHolder>, LockError> {
        let path = run_dir.join(LOCK_FILE_NAME);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LockError::Io(e)),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| LockError::CorruptedHolder {
                reason: e.to_string(),
            })
    }
}

impl std::fmt::Debug for ConsoleLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleLock")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Scoped ownership of the console. Dropping it releases the lock.
pub struct ConsoleGuard<'a> {
    guard: Option<RwLockWriteGuard<'a, File>>,
    holder: LockHolder,
}

impl ConsoleGuard<'_> {
    #[must_use]
    pub fn holder(&self) -> &LockHolder {
        &self.holder
    }

    /// Release explicitly. Equivalent to dropping the guard.
    pub fn release(self) {}
}

impl Drop for ConsoleGuard<'_> {
    fn drop(&mut self) {
        if let Some(mut guard) = self.guard.take() {
            // Clear the record before unlocking; the file itself stays so that
            // every handle keeps locking the same inode.
            let file: &mut File = &mut guard;
            let _ = file.set_len(0);
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    // ERROR_LOCK_VIOLATION from LockFileEx with LOCKFILE_FAIL_IMMEDIATELY
    #[cfg(windows)]
    if err.raw_os_error() == Some(33) {
        return true;
    }
    false
}
