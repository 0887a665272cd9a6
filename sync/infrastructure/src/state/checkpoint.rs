use async_trait::async_trait;
use shaku::Component;
use std::io::ErrorKind;
use std::path::PathBuf;
use sync_application::{ProgressError, ProgressStore, SyncMode, SyncProgress};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::atomic;

pub const PROGRESS_FILE: &str = "sync_progress.json";
pub const INCREMENTAL_PROGRESS_FILE: &str = "sync_progress_incremental.json";
pub const BY_DATE_PROGRESS_FILE: &str = "sync_progress_by_date.json";

pub fn progress_file(mode: SyncMode) -> &'static str {
    match mode {
        SyncMode::Full => PROGRESS_FILE,
        SyncMode::Incremental => INCREMENTAL_PROGRESS_FILE,
        SyncMode::ByDate => BY_DATE_PROGRESS_FILE,
    }
}

/// Checkpoints kept as one JSON document per sync mode in the data
/// directory, so a by-date run never touches an interrupted full sync.
///
/// Conditional writes compare `job_instance_id` with the stored value while
/// holding the store mutex, so a run that lost ownership cannot overwrite the
/// checkpoint of the run that took over.
#[derive(Component)]
#[shaku(interface = ProgressStore)]
pub struct JsonProgressStore {
    data_dir: PathBuf,

    #[shaku(default = Mutex::new(()))]
    guard: Mutex<()>,
}

impl JsonProgressStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            guard: Mutex::new(()),
        }
    }

    fn path(&self, mode: SyncMode) -> PathBuf {
        self.data_dir.join(progress_file(mode))
    }

    fn read(&self, mode: SyncMode) -> Result<Option<SyncProgress>, ProgressError> {
        let raw = match std::fs::read(self.path(mode)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let progress: SyncProgress =
            serde_json::from_slice(&raw).map_err(|e| ProgressError::Corrupt(e.to_string()))?;
        if progress.mode != mode {
            warn!(
                "Ignoring {} checkpoint stored in {}",
                progress.mode,
                progress_file(mode)
            );
            return Ok(None);
        }
        Ok(Some(progress))
    }

    fn write(&self, progress: &SyncProgress) -> Result<(), ProgressError> {
        let bytes = serde_json::to_vec_pretty(progress)
            .map_err(|e| ProgressError::Corrupt(e.to_string()))?;
        atomic::write_bytes(&self.path(progress.mode), &bytes)?;
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for JsonProgressStore {
    async fn load(&self, mode: SyncMode) -> Result<Option<SyncProgress>, ProgressError> {
        let _guard = self.guard.lock().await;
        self.read(mode)
    }

    async fn load_all(&self) -> Result<Vec<SyncProgress>, ProgressError> {
        let _guard = self.guard.lock().await;
        let mut checkpoints = Vec::new();
        for mode in SyncMode::ALL {
            if let Some(progress) = self.read(mode)? {
                checkpoints.push(progress);
            }
        }
        Ok(checkpoints)
    }

    async fn upsert(&self, progress: &SyncProgress) -> Result<(), ProgressError> {
        let _guard = self.guard.lock().await;
        self.write(progress)
    }

    async fn checkpoint(&self, progress: &SyncProgress) -> Result<(), ProgressError> {
        let _guard = self.guard.lock().await;

        let current = self
            .read(progress.mode)?
            .ok_or_else(|| ProgressError::NotFound(self.path(progress.mode).display().to_string()))?;
        if current.job_instance_id != progress.job_instance_id {
            return Err(ProgressError::StaleInstance {
                expected: progress.job_instance_id.clone(),
                found: current.job_instance_id,
            });
        }

        debug!(
            "Checkpoint {} ({}): {} codes, {} dates",
            progress.job_instance_id,
            progress.mode,
            progress.completed_codes.len(),
            progress.completed_dates.len()
        );
        self.write(progress)
    }

    async fn clear(&self, mode: SyncMode) -> Result<(), ProgressError> {
        let _guard = self.guard.lock().await;
        match std::fs::remove_file(self.path(mode)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
