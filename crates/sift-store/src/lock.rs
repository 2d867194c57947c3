//! Advisory lock files for artifacts.
//!
//! Archival and selection edits on one artifact are mutually exclusive
//! across processes. The lock is a `create_new` file holding the owner's pid;
//! a lock whose pid is no longer running is stale and gets removed.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::StoreError;

const LOCK_WAIT_TIMEOUT: Duration = Duration::from_secs(300);
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Held lock. The file is removed on drop.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Lock file at a fixed path.
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
    timeout: Duration,
}

impl FileLock {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: LOCK_WAIT_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wait for the lock, removing it first if its owner has exited.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another live process still holds the
    /// lock after the timeout, or [`StoreError::LockUnavailable`] if the lock
    /// file cannot be read or created.
    pub async fn acquire(&self) -> Result<LockGuard, StoreError> {
        let started = Instant::now();
        loop {
            match try_acquire(&self.path) {
                Ok(guard) => return Ok(guard),
                Err(LockState::HeldBy(pid)) => {
                    if started.elapsed() >= self.timeout {
                        return Err(StoreError::Locked {
                            path: self.path.clone(),
                            pid,
                        });
                    }
                    tokio::time::sleep(LOCK_RETRY_DELAY).await;
                }
                Err(LockState::Stale(pid)) => {
                    tracing::warn!(path = %self.path.display(), pid, "removing stale lock");
                    let _ = std::fs::remove_file(&self.path);
                }
                Err(LockState::Unknown) => {
                    if started.elapsed() >= self.timeout {
                        return Err(StoreError::LockUnavailable {
                            path: self.path.clone(),
                        });
                    }
                    tokio::time::sleep(LOCK_RETRY_DELAY).await;
                }
            }
        }
    }
}

#[derive(Debug)]
enum LockState {
    HeldBy(i32),
    Stale(i32),
    Unknown,
}

fn try_acquire(lock_path: &Path) -> Result<LockGuard, LockState> {
    if let Some(parent) = lock_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(lock_path)
    {
        Ok(mut file) => {
            let pid = std::process::id();
            let _ = writeln!(file, "{pid}");
            Ok(LockGuard {
                path: lock_path.to_path_buf(),
            })
        }
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            let mut pid_buf = String::new();
            if OpenOptions::new()
                .read(true)
                .open(lock_path)
                .and_then(|mut file| file.read_to_string(&mut pid_buf))
                .is_err()
            {
                return Err(LockState::Unknown);
            }

            match pid_buf.trim().parse::<i32>().ok() {
                Some(pid) if is_process_running(pid) => Err(LockState::HeldBy(pid)),
                Some(pid) => Err(LockState::Stale(pid)),
                None => Err(LockState::Unknown),
            }
        }
        Err(_) => Err(LockState::Unknown),
    }
}

fn is_process_running(pid: i32) -> bool {
    if i32::try_from(std::process::id()).is_ok_and(|own| own == pid) {
        return true;
    }
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .status()
        .is_ok_and(|status| status.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquires_and_releases_lock_file() {
        let temp = tempfile::tempdir().unwrap();
        let lock_path = temp.path().join("briefs/2024-01-01.lock");

        let guard = try_acquire(&lock_path).unwrap();
        assert!(lock_path.is_file());
        drop(guard);
        assert!(!lock_path.exists());
    }

    #[tokio::test]
    async fn live_holder_times_out() {
        let temp = tempfile::tempdir().unwrap();
        let lock = FileLock::new(temp.path().join("a.lock")).with_timeout(Duration::ZERO);

        let _held = lock.acquire().await.unwrap();
        let err = lock.acquire().await.unwrap_err();
        assert!(matches!(err, StoreError::Locked { pid, .. } if pid == i32::try_from(std::process::id()).unwrap()));
    }

    #[tokio::test]
    async fn garbage_lock_is_unavailable() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("a.lock");
        std::fs::write(&path, "not-a-pid").unwrap();

        let err = FileLock::new(&path)
            .with_timeout(Duration::ZERO)
            .acquire()
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::LockUnavailable { .. }));
    }
}
