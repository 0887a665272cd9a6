use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shaku::Interface;

/// Cross-process guard so only one sync writes the data directory at a time.
pub trait SyncLock: Interface {
    fn try_acquire(&self) -> Result<SyncLease, LockError>;

    /// Owner of the lock when another process currently holds it.
    fn holder(&self) -> Result<Option<LockInfo>, LockError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub start_time: DateTime<Utc>,
}

/// Held for the duration of a sync run; dropping it releases the lock.
pub struct SyncLease {
    _guard: Box<dyn Send + Sync>,
}

impl SyncLease {
    pub fn new(guard: impl Send + Sync + 'static) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

impl std::fmt::Debug for SyncLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncLease").finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Sync lock already held{}", .0.as_ref().map(|i| format!(" by pid {}", i.pid)).unwrap_or_default())]
    AlreadyHeld(Option<LockInfo>),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
