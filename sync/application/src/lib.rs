pub mod archive;
pub mod gap_detector;
pub mod health;
pub mod metadata;
pub mod ports;
pub mod progress;
pub mod rate_limiter;
pub mod status;
pub mod sync_lock;
pub mod sync_service;

pub use archive::{ArchiveError, Archiver, ExportReport, ImportReport};
pub use gap_detector::{GapDetectionError, GapDetector};
pub use health::{ApiHealthProbe, HealthChecker, HealthProbeSettings, HealthStatus};
pub use metadata::{MetadataError, MetadataStore, SyncMetadata};
pub use ports::{
    BarRepository, GatewayError, MarketDataGateway, RepositoryError, StorageStats, UpsertOutcome,
};
pub use progress::{JobInstanceId, JobStatus, ProgressError, ProgressStore, SyncMode, SyncProgress};
pub use rate_limiter::{RateLimiter, RateLimiterError};
pub use status::{ProgressSummary, StatusError, StatusReport, StatusService, StatusServiceImpl};
pub use sync_lock::{LockError, LockInfo, SyncLease, SyncLock};
pub use sync_service::{
    DateSyncRequest, FullSyncRequest, IncrementalRequest, StopFlag, SymbolOutcome, SyncError,
    SyncReport, SyncService, SyncServiceImpl, SyncSettings,
};
