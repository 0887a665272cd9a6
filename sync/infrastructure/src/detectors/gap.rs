use arrow::array::Array;
use async_trait::async_trait;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use parquet::file::reader::{FileReader, SerializedFileReader};
use shaku::Component;
use std::fs;
use std::path::{Path, PathBuf};
use sync_application::{GapDetectionError, GapDetector};
use sync_domain::{format_compact, DataGap};
use tracing::warn;

use crate::repositories::parquet::DAILY_DIR;

/// A trading day is complete when its partition has rows and every row
/// carries an adjustment factor.
#[derive(Component)]
#[shaku(interface = GapDetector)]
pub struct ParquetGapDetector {
    data_dir: PathBuf,
}

impl ParquetGapDetector {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn existing_dates(&self, calendar: &[NaiveDate]) -> Result<Vec<NaiveDate>, GapDetectionError> {
        let daily_dir = self.data_dir.join(DAILY_DIR);
        if !daily_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut dates = Vec::new();
        for date in calendar {
            let path = daily_dir.join(format!("{}.parquet", format_compact(*date)));
            if !path.is_file() {
                continue;
            }

            match Self::partition_is_complete(&path) {
                Ok(true) => dates.push(*date),
                Ok(false) => {}
                Err(GapDetectionError::UnreadablePartition { path, reason }) => {
                    warn!("Treating {} as missing: {}", path, reason);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(dates)
    }

    fn partition_is_complete(path: &Path) -> Result<bool, GapDetectionError> {
        let unreadable = |reason: String| GapDetectionError::UnreadablePartition {
            path: path.display().to_string(),
            reason,
        };

        let reader = SerializedFileReader::new(fs::File::open(path)?)
            .map_err(|e| unreadable(e.to_string()))?;
        if reader.metadata().file_metadata().num_rows() == 0 {
            return Ok(false);
        }

        let builder = ParquetRecordBatchReaderBuilder::try_new(fs::File::open(path)?)
            .map_err(|e| unreadable(e.to_string()))?;
        let Some(index) = builder
            .schema()
            .fields()
            .iter()
            .position(|field| field.name() == "adj_factor")
        else {
            return Ok(false);
        };

        let mask = ProjectionMask::roots(builder.parquet_schema(), [index]);
        let batches = builder
            .with_projection(mask)
            .build()
            .map_err(|e| unreadable(e.to_string()))?;

        for batch in batches {
            let batch = batch.map_err(|e| unreadable(e.to_string()))?;
            if batch.column(0).null_count() > 0 {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

#[async_trait]
impl GapDetector for ParquetGapDetector {
    async fn detect_gaps(&self, calendar: &[NaiveDate]) -> Result<Vec<DataGap>, GapDetectionError> {
        let existing = self.existing_dates(calendar)?;
        Ok(sync_domain::detect_gaps(calendar, &existing))
    }
}
