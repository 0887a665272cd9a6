use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shaku::Interface;
use std::collections::BTreeSet;
use std::fmt;
use sync_domain::{DateRange, StockCode};

pub type JobInstanceId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Interrupted,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Interrupted => "INTERRUPTED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Full,
    Incremental,
    ByDate,
}

impl SyncMode {
    pub const ALL: [SyncMode; 3] = [SyncMode::Full, SyncMode::Incremental, SyncMode::ByDate];
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncMode::Full => "full",
            SyncMode::Incremental => "incremental",
            SyncMode::ByDate => "by_date",
        };
        f.write_str(name)
    }
}

/// Checkpoint contents. Every field added after the first release must
/// default so older checkpoint files still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncProgress {
    pub status: JobStatus,
    pub job_instance_id: JobInstanceId,
    pub mode: SyncMode,
    pub start_time: DateTime<Utc>,
    pub heartbeat_at: DateTime<Utc>,
    #[serde(default)]
    pub range: Option<DateRange>,
    #[serde(default)]
    pub completed_codes: BTreeSet<StockCode>,
    #[serde(default)]
    pub failed_codes: BTreeSet<StockCode>,
    #[serde(default)]
    pub completed_dates: BTreeSet<NaiveDate>,
    #[serde(default)]
    pub last_code: Option<StockCode>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl SyncProgress {
    pub fn new(
        job_instance_id: JobInstanceId,
        mode: SyncMode,
        range: Option<DateRange>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            status: JobStatus::Running,
            job_instance_id,
            mode,
            start_time: now,
            heartbeat_at: now,
            range,
            completed_codes: BTreeSet::new(),
            failed_codes: BTreeSet::new(),
            completed_dates: BTreeSet::new(),
            last_code: None,
            last_error: None,
        }
    }

    pub fn mark_completed(&mut self, code: &StockCode) {
        self.failed_codes.remove(code);
        self.completed_codes.insert(code.clone());
        self.last_code = Some(code.clone());
    }

    pub fn mark_failed(&mut self, code: &StockCode, message: &str) {
        self.failed_codes.insert(code.clone());
        self.last_code = Some(code.clone());
        self.last_error = Some(message.to_string());
    }

    pub fn is_live(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        self.status == JobStatus::Running && now.signed_duration_since(self.heartbeat_at) <= timeout
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("Checkpoint not found: {0}")]
    NotFound(String),
    #[error("Checkpoint owned by another run (expected {expected}, found {found})")]
    StaleInstance { expected: String, found: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt checkpoint: {0}")]
    Corrupt(String),
}

/// Checkpoints are keyed by `SyncMode`: a run only ever reads, replaces or
/// clears the checkpoint of its own mode.
#[async_trait]
pub trait ProgressStore: Interface {
    async fn load(&self, mode: SyncMode) -> Result<Option<SyncProgress>, ProgressError>;

    /// Every stored checkpoint, in `SyncMode::ALL` order.
    async fn load_all(&self) -> Result<Vec<SyncProgress>, ProgressError>;

    /// Unconditional write under `progress.mode`, used when a run starts or
    /// takes over.
    async fn upsert(&self, progress: &SyncProgress) -> Result<(), ProgressError>;

    /// Write that fails when the stored checkpoint belongs to another run.
    async fn checkpoint(&self, progress: &SyncProgress) -> Result<(), ProgressError>;

    async fn clear(&self, mode: SyncMode) -> Result<(), ProgressError>;
}
