pub mod parquet;

pub use parquet::{ParquetBarRepository, ParquetBarRepositoryParameters};
