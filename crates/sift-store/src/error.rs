//! Store error types.

use std::path::PathBuf;

use sift_core::errors::{Classify, CoreError, ErrorClass};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// Lookup by id returned nothing.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Another process holds the lock file.
    #[error("{} is locked by pid {pid}; try again after it finishes", path.display())]
    Locked { path: PathBuf, pid: i32 },

    /// The lock file exists but its owner cannot be determined.
    #[error("could not acquire lock at {}; remove it if no sift process is running", path.display())]
    LockUnavailable { path: PathBuf },

    /// A file that must be created fresh already exists.
    #[error("already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },
}

impl Classify for StoreError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Io(_) => ErrorClass::Configuration,
            Self::Json(_) | Self::NotFound { .. } => ErrorClass::MalformedContent,
            Self::Core(e) => e.class(),
            Self::Locked { .. } | Self::LockUnavailable { .. } | Self::AlreadyExists { .. } => {
                ErrorClass::Conflict
            }
        }
    }
}
