use async_trait::async_trait;
use chrono::NaiveDate;
use shaku::Interface;
use sync_domain::DataGap;

#[async_trait]
pub trait GapDetector: Interface {
    /// Runs of `calendar` dates whose whole-market partition is missing or
    /// incomplete.
    async fn detect_gaps(&self, calendar: &[NaiveDate]) -> Result<Vec<DataGap>, GapDetectionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GapDetectionError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unreadable partition {path}: {reason}")]
    UnreadablePartition { path: String, reason: String },
}
