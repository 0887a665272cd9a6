use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shaku::Interface;
use sync_domain::DateRange;

use crate::progress::SyncMode;

/// Summary of local storage written after each sync run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMetadata {
    #[serde(default)]
    pub last_sync_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_mode: Option<SyncMode>,
    #[serde(default)]
    pub total_stocks: usize,
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub date_partitions: usize,
    #[serde(default)]
    pub partition_range: Option<DateRange>,
    #[serde(default = "default_storage")]
    pub storage: String,
}

fn default_storage() -> String {
    "parquet".to_string()
}

impl Default for SyncMetadata {
    fn default() -> Self {
        Self {
            last_sync_date: None,
            last_mode: None,
            total_stocks: 0,
            days: 0,
            date_range: None,
            date_partitions: 0,
            partition_range: None,
            storage: default_storage(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt metadata: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait MetadataStore: Interface {
    /// Returns defaults when nothing has been written yet.
    async fn load(&self) -> Result<SyncMetadata, MetadataError>;
    async fn save(&self, metadata: &SyncMetadata) -> Result<(), MetadataError>;
}
