use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use shaku::{Component, Interface};
use std::sync::Arc;

use crate::metadata::{MetadataError, MetadataStore, SyncMetadata};
use crate::ports::{BarRepository, RepositoryError, StorageStats};
use crate::progress::{JobStatus, ProgressError, ProgressStore, SyncMode, SyncProgress};
use crate::sync_lock::{LockError, LockInfo, SyncLock};

#[async_trait]
pub trait StatusService: Interface {
    async fn report(&self) -> Result<StatusReport, StatusError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub metadata: SyncMetadata,
    pub storage: StorageStats,
    /// One entry per mode with a stored checkpoint.
    pub checkpoints: Vec<ProgressSummary>,
    pub active_sync: Option<LockInfo>,
}

/// Checkpoint digest; the full code sets are too large to print.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSummary {
    pub status: JobStatus,
    pub mode: SyncMode,
    pub completed: usize,
    pub completed_dates: usize,
    pub failed: usize,
    pub start_time: DateTime<Utc>,
    pub heartbeat_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl From<&SyncProgress> for ProgressSummary {
    fn from(progress: &SyncProgress) -> Self {
        Self {
            status: progress.status.clone(),
            mode: progress.mode,
            completed: progress.completed_codes.len(),
            completed_dates: progress.completed_dates.len(),
            failed: progress.failed_codes.len(),
            start_time: progress.start_time,
            heartbeat_at: progress.heartbeat_at,
            last_error: progress.last_error.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Checkpoint error: {0}")]
    Progress(#[from] ProgressError),
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),
}

#[derive(Component)]
#[shaku(interface = StatusService)]
pub struct StatusServiceImpl {
    #[shaku(inject)]
    metadata_store: Arc<dyn MetadataStore>,

    #[shaku(inject)]
    repository: Arc<dyn BarRepository>,

    #[shaku(inject)]
    progress_store: Arc<dyn ProgressStore>,

    #[shaku(inject)]
    sync_lock: Arc<dyn SyncLock>,
}

impl StatusServiceImpl {
    pub fn new(
        metadata_store: Arc<dyn MetadataStore>,
        repository: Arc<dyn BarRepository>,
        progress_store: Arc<dyn ProgressStore>,
        sync_lock: Arc<dyn SyncLock>,
    ) -> Self {
        Self {
            metadata_store,
            repository,
            progress_store,
            sync_lock,
        }
    }
}

#[async_trait]
impl StatusService for StatusServiceImpl {
    async fn report(&self) -> Result<StatusReport, StatusError> {
        let metadata = self.metadata_store.load().await?;
        let storage = self.repository.stats().await?;
        let checkpoints = self
            .progress_store
            .load_all()
            .await?
            .iter()
            .map(ProgressSummary::from)
            .collect();
        let active_sync = self.sync_lock.holder()?;

        Ok(StatusReport {
            metadata,
            storage,
            checkpoints,
            active_sync,
        })
    }
}
