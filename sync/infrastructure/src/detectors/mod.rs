pub mod gap;

pub use gap::{ParquetGapDetector, ParquetGapDetectorParameters};
