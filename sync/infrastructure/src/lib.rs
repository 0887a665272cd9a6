pub mod archive;
mod atomic;
pub mod detectors;
pub mod gateways;
pub mod rate_limiting;
pub mod repositories;
pub mod state;

pub use archive::TarGzArchiver;
pub use detectors::ParquetGapDetector;
pub use gateways::{MockMarketDataGateway, TushareConfig, TushareGateway};
pub use rate_limiting::{JitterRateLimiter, JitterRateLimiterConfig, RateLimitWindow};
pub use repositories::ParquetBarRepository;
pub use state::{FileSyncLock, JsonMetadataStore, JsonProgressStore};
