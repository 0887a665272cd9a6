use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use shaku::Interface;
use sync_domain::{BarIndicators, DailyBar, DateRange, StockBasic, StockCode};

use crate::rate_limiter::RateLimiterError;

/// Upstream market data provider. Implementations pace their own calls.
#[async_trait]
pub trait MarketDataGateway: Interface {
    /// Currently listed securities.
    async fn stock_list(&self) -> Result<Vec<StockBasic>, GatewayError>;

    /// Open trading days inside `range`, ascending.
    async fn trading_calendar(&self, range: &DateRange) -> Result<Vec<NaiveDate>, GatewayError>;

    async fn daily_bars_for_symbol(
        &self,
        code: &StockCode,
        range: &DateRange,
    ) -> Result<Vec<DailyBar>, GatewayError>;

    /// Whole-market bars for one date, merged with daily metrics and
    /// adjustment factors.
    async fn daily_bars_for_date(&self, date: NaiveDate) -> Result<Vec<DailyBar>, GatewayError>;
}

#[async_trait]
pub trait BarRepository: Interface {
    /// Merges `bars` into the symbol's history; rows for an existing trade
    /// date are replaced.
    async fn upsert_symbol(
        &self,
        code: &StockCode,
        bars: Vec<DailyBar>,
    ) -> Result<UpsertOutcome, RepositoryError>;

    async fn last_trade_date(&self, code: &StockCode) -> Result<Option<NaiveDate>, RepositoryError>;

    async fn stored_codes(&self) -> Result<Vec<StockCode>, RepositoryError>;

    /// Replaces the whole-market partition for `date`.
    async fn replace_date(&self, date: NaiveDate, bars: Vec<DailyBar>)
        -> Result<usize, RepositoryError>;

    /// Bars of one date partition; empty when the partition is absent.
    async fn date_bars(&self, date: NaiveDate) -> Result<Vec<DailyBar>, RepositoryError>;

    async fn stored_dates(&self) -> Result<Vec<NaiveDate>, RepositoryError>;

    /// Removes every date partition together with its derived indicators.
    async fn clear_dates(&self) -> Result<usize, RepositoryError>;

    /// Replaces the derived indicator partition for `date`.
    async fn replace_indicators(
        &self,
        date: NaiveDate,
        rows: Vec<BarIndicators>,
    ) -> Result<usize, RepositoryError>;

    async fn save_stock_basics(&self, basics: &[StockBasic]) -> Result<(), RepositoryError>;

    async fn stock_basics(&self) -> Result<Vec<StockBasic>, RepositoryError>;

    async fn stats(&self) -> Result<StorageStats, RepositoryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub inserted: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub symbols: usize,
    pub date_partitions: usize,
    pub files: usize,
    pub bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Upstream rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Upstream API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error("Rate limiter error: {0}")]
    RateLimiter(#[from] RateLimiterError),
}

impl GatewayError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GatewayError::RateLimited(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Corrupt file {path}: {reason}")]
    CorruptFile { path: String, reason: String },
}
