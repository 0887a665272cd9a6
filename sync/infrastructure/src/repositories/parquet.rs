use arrow::array::{
    Array, ArrayRef, Date32Array, Decimal128Array, Float64Array, RecordBatch, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::{ArrowWriter, ProjectionMask};
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use shaku::Component;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sync_application::{BarRepository, RepositoryError, StorageStats, UpsertOutcome};
use sync_domain::{
    format_compact, parse_compact, BarIndicators, BarMetrics, DailyBar, StockBasic, StockCode,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::atomic;

pub const STOCKS_DIR: &str = "stocks";
pub const DAILY_DIR: &str = "daily";
pub const INDICATORS_DIR: &str = "indicators";
pub const STOCK_BASIC_FILE: &str = "stock_basic.json";

const PRICE_PRECISION: u8 = 18;
const PRICE_SCALE: i8 = 4;
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

pub static BAR_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    let price = |name: &str, nullable: bool| {
        Field::new(name, DataType::Decimal128(PRICE_PRECISION, PRICE_SCALE), nullable)
    };
    let metric = |name: &str| Field::new(name, DataType::Float64, true);

    Arc::new(Schema::new(vec![
        Field::new("trade_date", DataType::Date32, false),
        Field::new("code", DataType::Utf8, false),
        price("open", false),
        price("high", false),
        price("low", false),
        price("close", false),
        price("pre_close", true),
        price("change", true),
        price("pct_chg", true),
        Field::new("volume", DataType::Float64, false),
        Field::new("amount", DataType::Float64, false),
        metric("turnover_rate"),
        metric("volume_ratio"),
        metric("pe"),
        metric("pe_ttm"),
        metric("pb"),
        metric("total_mv"),
        metric("circ_mv"),
        metric("total_share"),
        metric("float_share"),
        metric("adj_factor"),
    ]))
});

/// Derived from the `daily/` partitions: forward-adjusted OHLC, price moving
/// averages and volume moving averages.
pub static INDICATOR_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    let price = |name: &str, nullable: bool| {
        Field::new(name, DataType::Decimal128(PRICE_PRECISION, PRICE_SCALE), nullable)
    };

    Arc::new(Schema::new(vec![
        Field::new("trade_date", DataType::Date32, false),
        Field::new("code", DataType::Utf8, false),
        price("qfq_open", false),
        price("qfq_high", false),
        price("qfq_low", false),
        price("qfq_close", false),
        price("ma5", true),
        price("ma10", true),
        price("ma20", true),
        price("ma60", true),
        Field::new("vma5", DataType::Float64, true),
        Field::new("vma10", DataType::Float64, true),
        Field::new("vma20", DataType::Float64, true),
    ]))
});

/// Per-symbol history under `stocks/{code}.parquet`, whole-market
/// partitions under `daily/{YYYYMMDD}.parquet` and their indicators under
/// `indicators/{YYYYMMDD}.parquet`.
#[derive(Component)]
#[shaku(interface = BarRepository)]
pub struct ParquetBarRepository {
    data_dir: PathBuf,

    #[shaku(default = Mutex::new(()))]
    write_lock: Mutex<()>,
}

impl ParquetBarRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn symbol_path(&self, code: &StockCode) -> PathBuf {
        self.data_dir
            .join(STOCKS_DIR)
            .join(format!("{}.parquet", code.as_str()))
    }

    fn date_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir
            .join(DAILY_DIR)
            .join(format!("{}.parquet", format_compact(date)))
    }

    fn indicators_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir
            .join(INDICATORS_DIR)
            .join(format!("{}.parquet", format_compact(date)))
    }

    fn basics_path(&self) -> PathBuf {
        self.data_dir.join(STOCK_BASIC_FILE)
    }

    fn bars_to_record_batch(bars: &[DailyBar]) -> Result<RecordBatch, RepositoryError> {
        let dates: Date32Array = bars
            .iter()
            .map(|bar| days_since_epoch(bar.trade_date()))
            .collect::<Vec<i32>>()
            .into();
        let codes = StringArray::from(
            bars.iter()
                .map(|bar| bar.code().as_str())
                .collect::<Vec<&str>>(),
        );

        let price = |get: fn(&DailyBar) -> Decimal| decimal_array(bars.iter().map(|b| Some(get(b))));
        let optional_price = |get: fn(&DailyBar) -> Option<Decimal>| decimal_array(bars.iter().map(get));
        let metric = |get: fn(&BarMetrics) -> Option<f64>| -> ArrayRef {
            Arc::new(bars.iter().map(|b| get(b.metrics())).collect::<Float64Array>())
        };

        let arrays: Vec<ArrayRef> = vec![
            Arc::new(dates),
            Arc::new(codes),
            price(DailyBar::open)?,
            price(DailyBar::high)?,
            price(DailyBar::low)?,
            price(DailyBar::close)?,
            optional_price(DailyBar::pre_close)?,
            optional_price(DailyBar::change)?,
            optional_price(DailyBar::pct_chg)?,
            Arc::new(Float64Array::from(
                bars.iter().map(DailyBar::volume).collect::<Vec<f64>>(),
            )),
            Arc::new(Float64Array::from(
                bars.iter().map(DailyBar::amount).collect::<Vec<f64>>(),
            )),
            metric(|m| m.turnover_rate),
            metric(|m| m.volume_ratio),
            metric(|m| m.pe),
            metric(|m| m.pe_ttm),
            metric(|m| m.pb),
            metric(|m| m.total_mv),
            metric(|m| m.circ_mv),
            metric(|m| m.total_share),
            metric(|m| m.float_share),
            Arc::new(bars.iter().map(DailyBar::adj_factor).collect::<Float64Array>()),
        ];

        RecordBatch::try_new(BAR_SCHEMA.clone(), arrays)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))
    }

    fn record_batch_to_bars(batch: &RecordBatch, path: &Path) -> Result<Vec<DailyBar>, RepositoryError> {
        let corrupt = |reason: String| RepositoryError::CorruptFile {
            path: path.display().to_string(),
            reason,
        };

        let dates = column::<Date32Array>(batch, "trade_date", path)?;
        let codes = column::<StringArray>(batch, "code", path)?;
        let open = column::<Decimal128Array>(batch, "open", path)?;
        let high = column::<Decimal128Array>(batch, "high", path)?;
        let low = column::<Decimal128Array>(batch, "low", path)?;
        let close = column::<Decimal128Array>(batch, "close", path)?;
        let pre_close = column::<Decimal128Array>(batch, "pre_close", path)?;
        let change = column::<Decimal128Array>(batch, "change", path)?;
        let pct_chg = column::<Decimal128Array>(batch, "pct_chg", path)?;
        let volume = column::<Float64Array>(batch, "volume", path)?;
        let amount = column::<Float64Array>(batch, "amount", path)?;
        let metric = |name: &str| column::<Float64Array>(batch, name, path);
        let turnover_rate = metric("turnover_rate")?;
        let volume_ratio = metric("volume_ratio")?;
        let pe = metric("pe")?;
        let pe_ttm = metric("pe_ttm")?;
        let pb = metric("pb")?;
        let total_mv = metric("total_mv")?;
        let circ_mv = metric("circ_mv")?;
        let total_share = metric("total_share")?;
        let float_share = metric("float_share")?;
        let adj_factor = metric("adj_factor")?;

        let mut bars = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            let code = StockCode::parse(codes.value(i)).map_err(|e| corrupt(e.to_string()))?;
            let trade_date = date_from_days(dates.value(i))
                .ok_or_else(|| corrupt(format!("trade_date out of range at row {i}")))?;

            let bar = DailyBar::new(
                trade_date,
                code,
                scaled(open.value(i)),
                scaled(high.value(i)),
                scaled(low.value(i)),
                scaled(close.value(i)),
                volume.value(i),
                amount.value(i),
            )
            .map_err(|e| corrupt(format!("row {i}: {e}")))?
            .with_previous_close(
                optional_scaled(pre_close, i),
                optional_scaled(change, i),
                optional_scaled(pct_chg, i),
            )
            .with_metrics(BarMetrics {
                turnover_rate: optional_f64(turnover_rate, i),
                volume_ratio: optional_f64(volume_ratio, i),
                pe: optional_f64(pe, i),
                pe_ttm: optional_f64(pe_ttm, i),
                pb: optional_f64(pb, i),
                total_mv: optional_f64(total_mv, i),
                circ_mv: optional_f64(circ_mv, i),
                total_share: optional_f64(total_share, i),
                float_share: optional_f64(float_share, i),
            })
            .with_adj_factor(optional_f64(adj_factor, i));

            bars.push(bar);
        }

        Ok(bars)
    }

    pub fn read_bars(path: &Path) -> Result<Vec<DailyBar>, RepositoryError> {
        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .and_then(|builder| builder.build())
            .map_err(|e| corrupt_file(path, e))?;

        let mut bars = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| corrupt_file(path, e))?;
            bars.extend(Self::record_batch_to_bars(&batch, path)?);
        }
        Ok(bars)
    }

    fn indicators_to_record_batch(rows: &[BarIndicators]) -> Result<RecordBatch, RepositoryError> {
        let dates: Date32Array = rows
            .iter()
            .map(|row| days_since_epoch(row.trade_date))
            .collect::<Vec<i32>>()
            .into();
        let codes = StringArray::from(
            rows.iter()
                .map(|row| row.code.as_str())
                .collect::<Vec<&str>>(),
        );

        let price = |get: fn(&BarIndicators) -> Decimal| decimal_array(rows.iter().map(|r| Some(get(r))));
        let average = |get: fn(&BarIndicators) -> Option<Decimal>| decimal_array(rows.iter().map(get));
        let volume = |get: fn(&BarIndicators) -> Option<f64>| -> ArrayRef {
            Arc::new(rows.iter().map(get).collect::<Float64Array>())
        };

        let arrays: Vec<ArrayRef> = vec![
            Arc::new(dates),
            Arc::new(codes),
            price(|r| r.qfq_open)?,
            price(|r| r.qfq_high)?,
            price(|r| r.qfq_low)?,
            price(|r| r.qfq_close)?,
            average(|r| r.ma5)?,
            average(|r| r.ma10)?,
            average(|r| r.ma20)?,
            average(|r| r.ma60)?,
            volume(|r| r.vma5),
            volume(|r| r.vma10),
            volume(|r| r.vma20),
        ];

        RecordBatch::try_new(INDICATOR_SCHEMA.clone(), arrays)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))
    }

    fn record_batch_to_indicators(
        batch: &RecordBatch,
        path: &Path,
    ) -> Result<Vec<BarIndicators>, RepositoryError> {
        let dates = column::<Date32Array>(batch, "trade_date", path)?;
        let codes = column::<StringArray>(batch, "code", path)?;
        let price = |name: &str| column::<Decimal128Array>(batch, name, path);
        let (qfq_open, qfq_high, qfq_low, qfq_close) = (
            price("qfq_open")?,
            price("qfq_high")?,
            price("qfq_low")?,
            price("qfq_close")?,
        );
        let (ma5, ma10, ma20, ma60) = (price("ma5")?, price("ma10")?, price("ma20")?, price("ma60")?);
        let volume = |name: &str| column::<Float64Array>(batch, name, path);
        let (vma5, vma10, vma20) = (volume("vma5")?, volume("vma10")?, volume("vma20")?);

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            let code = StockCode::parse(codes.value(i)).map_err(|e| corrupt_file(path, e))?;
            let trade_date = date_from_days(dates.value(i))
                .ok_or_else(|| corrupt_file(path, format!("trade_date out of range at row {i}")))?;

            rows.push(BarIndicators {
                trade_date,
                code,
                qfq_open: scaled(qfq_open.value(i)),
                qfq_high: scaled(qfq_high.value(i)),
                qfq_low: scaled(qfq_low.value(i)),
                qfq_close: scaled(qfq_close.value(i)),
                ma5: optional_scaled(ma5, i),
                ma10: optional_scaled(ma10, i),
                ma20: optional_scaled(ma20, i),
                ma60: optional_scaled(ma60, i),
                vma5: optional_f64(vma5, i),
                vma10: optional_f64(vma10, i),
                vma20: optional_f64(vma20, i),
            });
        }

        Ok(rows)
    }

    pub fn read_indicators(path: &Path) -> Result<Vec<BarIndicators>, RepositoryError> {
        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .and_then(|builder| builder.build())
            .map_err(|e| corrupt_file(path, e))?;

        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| corrupt_file(path, e))?;
            rows.extend(Self::record_batch_to_indicators(&batch, path)?);
        }
        Ok(rows)
    }

    fn write_bars(path: &Path, bars: &[DailyBar]) -> Result<(), RepositoryError> {
        let batch = Self::bars_to_record_batch(bars)?;
        Self::write_batch(path, BAR_SCHEMA.clone(), &batch)
    }

    fn write_batch(path: &Path, schema: SchemaRef, batch: &RecordBatch) -> Result<(), RepositoryError> {
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        atomic::write_with(path, |file| {
            let mut writer = ArrowWriter::try_new(file, schema, Some(props))
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
            writer
                .write(batch)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
            writer
                .close()
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
            Ok(())
        })
    }

    /// Reads only the `trade_date` column.
    fn latest_date(path: &Path) -> Result<Option<NaiveDate>, RepositoryError> {
        let file = File::open(path)?;
        let builder =
            ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| corrupt_file(path, e))?;
        let mask = ProjectionMask::roots(builder.parquet_schema(), [0]);
        let reader = builder
            .with_projection(mask)
            .build()
            .map_err(|e| corrupt_file(path, e))?;

        let mut latest: Option<i32> = None;
        for batch in reader {
            let batch = batch.map_err(|e| corrupt_file(path, e))?;
            let dates = column::<Date32Array>(&batch, "trade_date", path)?;
            if let Some(max) = arrow::compute::max(dates) {
                latest = Some(latest.map_or(max, |current| current.max(max)));
            }
        }

        Ok(latest.and_then(date_from_days))
    }

    fn parquet_stems(dir: &Path) -> Result<Vec<String>, RepositoryError> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut stems = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("parquet") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                stems.push(stem.to_string());
            }
        }
        stems.sort();
        Ok(stems)
    }

    fn dir_usage(dir: &Path) -> Result<(usize, u64), RepositoryError> {
        if !dir.is_dir() {
            return Ok((0, 0));
        }

        let mut files = 0;
        let mut bytes = 0;
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                files += 1;
                bytes += metadata.len();
            }
        }
        Ok((files, bytes))
    }
}

#[async_trait]
impl BarRepository for ParquetBarRepository {
    async fn upsert_symbol(
        &self,
        code: &StockCode,
        bars: Vec<DailyBar>,
    ) -> Result<UpsertOutcome, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let path = self.symbol_path(code);

        let mut merged: BTreeMap<NaiveDate, DailyBar> = if path.exists() {
            Self::read_bars(&path)?
                .into_iter()
                .map(|bar| (bar.trade_date(), bar))
                .collect()
        } else {
            BTreeMap::new()
        };

        let mut inserted = 0;
        for bar in bars {
            if bar.code() != code {
                warn!("Dropping {} bar routed to {}", bar.code(), code);
                continue;
            }
            if merged.insert(bar.trade_date(), bar).is_none() {
                inserted += 1;
            }
        }

        let rows: Vec<DailyBar> = merged.into_values().collect();
        Self::write_bars(&path, &rows)?;
        debug!("{}: {} new rows, {} total", code, inserted, rows.len());

        Ok(UpsertOutcome {
            inserted,
            total: rows.len(),
        })
    }

    async fn last_trade_date(&self, code: &StockCode) -> Result<Option<NaiveDate>, RepositoryError> {
        let path = self.symbol_path(code);
        if !path.exists() {
            return Ok(None);
        }
        Self::latest_date(&path)
    }

    async fn stored_codes(&self) -> Result<Vec<StockCode>, RepositoryError> {
        let stems = Self::parquet_stems(&self.data_dir.join(STOCKS_DIR))?;
        Ok(stems
            .iter()
            .filter_map(|stem| match StockCode::parse(stem) {
                Ok(code) => Some(code),
                Err(e) => {
                    warn!("Ignoring stray symbol file {}: {}", stem, e);
                    None
                }
            })
            .collect())
    }

    async fn replace_date(
        &self,
        date: NaiveDate,
        mut bars: Vec<DailyBar>,
    ) -> Result<usize, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        bars.retain(|bar| bar.trade_date() == date);
        bars.sort_by(|a, b| a.code().cmp(b.code()));
        bars.dedup_by(|a, b| a.code() == b.code());

        Self::write_bars(&self.date_path(date), &bars)?;
        Ok(bars.len())
    }

    async fn date_bars(&self, date: NaiveDate) -> Result<Vec<DailyBar>, RepositoryError> {
        let path = self.date_path(date);
        if !path.exists() {
            return Ok(Vec::new());
        }
        Self::read_bars(&path)
    }

    async fn stored_dates(&self) -> Result<Vec<NaiveDate>, RepositoryError> {
        let stems = Self::parquet_stems(&self.data_dir.join(DAILY_DIR))?;
        Ok(stems
            .iter()
            .filter_map(|stem| parse_compact(stem).ok())
            .collect())
    }

    async fn clear_dates(&self) -> Result<usize, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let dir = self.data_dir.join(DAILY_DIR);
        let mut removed = 0;

        for stem in Self::parquet_stems(&dir)? {
            fs::remove_file(dir.join(format!("{stem}.parquet")))?;
            removed += 1;
        }

        let derived = self.data_dir.join(INDICATORS_DIR);
        for stem in Self::parquet_stems(&derived)? {
            fs::remove_file(derived.join(format!("{stem}.parquet")))?;
        }
        info!("Removed {} date partitions", removed);
        Ok(removed)
    }

    async fn replace_indicators(
        &self,
        date: NaiveDate,
        mut rows: Vec<BarIndicators>,
    ) -> Result<usize, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        rows.retain(|row| row.trade_date == date);

        let batch = Self::indicators_to_record_batch(&rows)?;
        Self::write_batch(&self.indicators_path(date), INDICATOR_SCHEMA.clone(), &batch)?;
        Ok(rows.len())
    }

    async fn save_stock_basics(&self, basics: &[StockBasic]) -> Result<(), RepositoryError> {
        let payload = serde_json::to_vec_pretty(basics)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        atomic::write_bytes(&self.basics_path(), &payload)?;
        Ok(())
    }

    async fn stock_basics(&self) -> Result<Vec<StockBasic>, RepositoryError> {
        let path = self.basics_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read(&path)?;
        serde_json::from_slice(&raw).map_err(|e| RepositoryError::CorruptFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    async fn stats(&self) -> Result<StorageStats, RepositoryError> {
        let symbols = Self::parquet_stems(&self.data_dir.join(STOCKS_DIR))?.len();
        let date_partitions = Self::parquet_stems(&self.data_dir.join(DAILY_DIR))?.len();
        let (stock_files, stock_bytes) = Self::dir_usage(&self.data_dir.join(STOCKS_DIR))?;
        let (daily_files, daily_bytes) = Self::dir_usage(&self.data_dir.join(DAILY_DIR))?;
        let (derived_files, derived_bytes) = Self::dir_usage(&self.data_dir.join(INDICATORS_DIR))?;

        Ok(StorageStats {
            symbols,
            date_partitions,
            files: stock_files + daily_files + derived_files,
            bytes: stock_bytes + daily_bytes + derived_bytes,
        })
    }
}

fn column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
    path: &Path,
) -> Result<&'a T, RepositoryError> {
    batch
        .column_by_name(name)
        .and_then(|array| array.as_any().downcast_ref::<T>())
        .ok_or_else(|| RepositoryError::CorruptFile {
            path: path.display().to_string(),
            reason: format!("missing or mistyped column '{name}'"),
        })
}

fn corrupt_file(path: &Path, error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::CorruptFile {
        path: path.display().to_string(),
        reason: error.to_string(),
    }
}

fn decimal_array(
    values: impl Iterator<Item = Option<Decimal>>,
) -> Result<ArrayRef, RepositoryError> {
    let array = values
        .map(|value| value.map(to_scaled))
        .collect::<Decimal128Array>()
        .with_precision_and_scale(PRICE_PRECISION, PRICE_SCALE)
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
    Ok(Arc::new(array))
}

fn to_scaled(value: Decimal) -> i128 {
    let mut value = value.round_dp(PRICE_SCALE as u32);
    value.rescale(PRICE_SCALE as u32);
    value.mantissa()
}

fn scaled(raw: i128) -> Decimal {
    Decimal::from_i128_with_scale(raw, PRICE_SCALE as u32)
}

fn optional_scaled(array: &Decimal128Array, i: usize) -> Option<Decimal> {
    (!array.is_null(i)).then(|| scaled(array.value(i)))
}

fn optional_f64(array: &Float64Array, i: usize) -> Option<f64> {
    (!array.is_null(i)).then(|| array.value(i))
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_CE_DAYS
}

fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_CE_DAYS)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_day_conversion() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(days_since_epoch(epoch), 0);

        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        assert_eq!(date_from_days(days_since_epoch(date)), Some(date));
    }

    #[test]
    fn test_decimal_scaling_rounds_to_four_places() {
        assert_eq!(to_scaled(Decimal::new(1234, 2)), 123_400);
        assert_eq!(to_scaled(Decimal::new(123_456, 5)), 12_346);
        assert_eq!(scaled(123_400), Decimal::new(1234, 2));
    }
}
