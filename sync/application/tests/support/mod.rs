#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sync_application::{
    BarRepository, GapDetectionError, GapDetector, GatewayError, HealthChecker, HealthStatus,
    LockError, LockInfo, MarketDataGateway, MetadataError, MetadataStore, ProgressError,
    ProgressStore, RepositoryError, StopFlag, StorageStats, SyncLease, SyncLock, SyncMetadata,
    SyncMode, SyncProgress, SyncServiceImpl, SyncSettings, UpsertOutcome,
};
use sync_domain::{detect_gaps, BarIndicators, DailyBar, DateRange, StockBasic, StockCode};
use tokio::sync::Mutex;

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

pub fn code(raw: &str) -> StockCode {
    StockCode::parse(raw).unwrap()
}

pub fn basic(raw: &str) -> StockBasic {
    StockBasic::new(code(raw), format!("Stock {raw}"))
}

pub fn bar(raw: &str, date: NaiveDate) -> DailyBar {
    DailyBar::new(
        date,
        code(raw),
        Decimal::new(1_000, 2),
        Decimal::new(1_050, 2),
        Decimal::new(990, 2),
        Decimal::new(1_020, 2),
        12_000.0,
        12_240.0,
    )
    .unwrap()
    .with_adj_factor(Some(1.0))
}

pub fn bars(raw: &str, days: &[u32]) -> Vec<DailyBar> {
    days.iter().map(|d| bar(raw, day(*d))).collect()
}

pub fn fast_settings() -> SyncSettings {
    SyncSettings {
        cooldown: Duration::from_millis(10),
        ..SyncSettings::default()
    }
}

pub struct Harness {
    pub gateway: Arc<StubGateway>,
    pub repository: Arc<InMemoryBarRepository>,
    pub progress: Arc<InMemoryProgressStore>,
    pub metadata: Arc<InMemoryMetadataStore>,
    pub health: Arc<StubHealthChecker>,
    pub lock: Arc<StubSyncLock>,
}

impl Harness {
    pub fn new(gateway: StubGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
            repository: Arc::new(InMemoryBarRepository::default()),
            progress: Arc::new(InMemoryProgressStore::default()),
            metadata: Arc::new(InMemoryMetadataStore::default()),
            health: Arc::new(StubHealthChecker::new(HealthStatus::Healthy)),
            lock: Arc::new(StubSyncLock::default()),
        }
    }

    pub fn service(&self, settings: SyncSettings) -> SyncServiceImpl {
        let gap_detector = Arc::new(RepositoryGapDetector {
            repository: self.repository.clone(),
        });
        SyncServiceImpl::new(
            self.gateway.clone(),
            self.repository.clone(),
            self.progress.clone(),
            self.metadata.clone(),
            self.health.clone(),
            gap_detector,
            self.lock.clone(),
            settings,
        )
    }
}

#[derive(Default)]
pub struct StubGateway {
    basics: Vec<StockBasic>,
    calendar: Vec<NaiveDate>,
    symbol_bars: HashMap<StockCode, Vec<DailyBar>>,
    date_bars: HashMap<NaiveDate, Vec<DailyBar>>,
    throttled: HashSet<StockCode>,
    symbol_requests: Mutex<Vec<(StockCode, DateRange)>>,
    stock_list_calls: AtomicUsize,
    bar_requests: AtomicUsize,
    stop_after: Mutex<Option<(usize, StopFlag)>>,
}

impl StubGateway {
    pub fn with_basics(mut self, basics: Vec<StockBasic>) -> Self {
        self.basics = basics;
        self
    }

    pub fn with_calendar(mut self, calendar: Vec<NaiveDate>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_symbol_bars(mut self, raw: &str, bars: Vec<DailyBar>) -> Self {
        self.symbol_bars.insert(code(raw), bars);
        self
    }

    pub fn with_date_bars(mut self, date: NaiveDate, bars: Vec<DailyBar>) -> Self {
        self.date_bars.insert(date, bars);
        self
    }

    pub fn throttling(mut self, raw: &str) -> Self {
        self.throttled.insert(code(raw));
        self
    }

    /// Raises `stop` once `count` bar requests, by symbol or by date, have
    /// been served.
    pub async fn stop_after(&self, count: usize, stop: StopFlag) {
        *self.stop_after.lock().await = Some((count, stop));
    }

    pub async fn symbol_requests(&self) -> Vec<(StockCode, DateRange)> {
        self.symbol_requests.lock().await.clone()
    }

    pub fn stock_list_calls(&self) -> usize {
        self.stock_list_calls.load(Ordering::SeqCst)
    }

    async fn count_bar_request(&self) {
        let served = self.bar_requests.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, stop)) = self.stop_after.lock().await.as_ref() {
            if served >= *count {
                stop.request();
            }
        }
    }
}

#[async_trait]
impl MarketDataGateway for StubGateway {
    async fn stock_list(&self) -> Result<Vec<StockBasic>, GatewayError> {
        self.stock_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.basics.clone())
    }

    async fn trading_calendar(&self, range: &DateRange) -> Result<Vec<NaiveDate>, GatewayError> {
        Ok(self
            .calendar
            .iter()
            .copied()
            .filter(|date| range.contains(*date))
            .collect())
    }

    async fn daily_bars_for_symbol(
        &self,
        code: &StockCode,
        range: &DateRange,
    ) -> Result<Vec<DailyBar>, GatewayError> {
        self.symbol_requests
            .lock()
            .await
            .push((code.clone(), range.clone()));
        self.count_bar_request().await;

        if self.throttled.contains(code) {
            return Err(GatewayError::RateLimited("quota exceeded".into()));
        }

        Ok(self
            .symbol_bars
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|bar| range.contains(bar.trade_date()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn daily_bars_for_date(&self, date: NaiveDate) -> Result<Vec<DailyBar>, GatewayError> {
        self.count_bar_request().await;
        Ok(self.date_bars.get(&date).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryBarRepository {
    symbols: Mutex<BTreeMap<StockCode, BTreeMap<NaiveDate, DailyBar>>>,
    dates: Mutex<BTreeMap<NaiveDate, Vec<DailyBar>>>,
    indicators: Mutex<BTreeMap<NaiveDate, Vec<BarIndicators>>>,
    basics: Mutex<Vec<StockBasic>>,
}

impl InMemoryBarRepository {
    pub async fn seed_symbol(&self, raw: &str, bars: Vec<DailyBar>) {
        let mut symbols = self.symbols.lock().await;
        let entry = symbols.entry(code(raw)).or_default();
        for bar in bars {
            entry.insert(bar.trade_date(), bar);
        }
    }

    pub async fn seed_date(&self, date: NaiveDate, bars: Vec<DailyBar>) {
        self.dates.lock().await.insert(date, bars);
    }

    pub async fn save_basics(&self, basics: Vec<StockBasic>) {
        *self.basics.lock().await = basics;
    }

    pub async fn symbol_dates(&self, raw: &str) -> Vec<NaiveDate> {
        self.symbols
            .lock()
            .await
            .get(&code(raw))
            .map(|rows| rows.keys().copied().collect())
            .unwrap_or_default()
    }

    pub async fn partition_rows(&self, date: NaiveDate) -> Option<usize> {
        self.dates.lock().await.get(&date).map(Vec::len)
    }

    pub async fn saved_basics(&self) -> Vec<StockBasic> {
        self.basics.lock().await.clone()
    }

    pub async fn indicators(&self, date: NaiveDate) -> Option<Vec<BarIndicators>> {
        self.indicators.lock().await.get(&date).cloned()
    }
}

#[async_trait]
impl BarRepository for InMemoryBarRepository {
    async fn upsert_symbol(
        &self,
        code: &StockCode,
        bars: Vec<DailyBar>,
    ) -> Result<UpsertOutcome, RepositoryError> {
        let mut symbols = self.symbols.lock().await;
        let entry = symbols.entry(code.clone()).or_default();
        let inserted = bars.len();
        for bar in bars {
            entry.insert(bar.trade_date(), bar);
        }
        Ok(UpsertOutcome {
            inserted,
            total: entry.len(),
        })
    }

    async fn last_trade_date(&self, code: &StockCode) -> Result<Option<NaiveDate>, RepositoryError> {
        Ok(self
            .symbols
            .lock()
            .await
            .get(code)
            .and_then(|rows| rows.keys().next_back().copied()))
    }

    async fn stored_codes(&self) -> Result<Vec<StockCode>, RepositoryError> {
        Ok(self.symbols.lock().await.keys().cloned().collect())
    }

    async fn replace_date(
        &self,
        date: NaiveDate,
        bars: Vec<DailyBar>,
    ) -> Result<usize, RepositoryError> {
        let rows = bars.len();
        self.dates.lock().await.insert(date, bars);
        Ok(rows)
    }

    async fn date_bars(&self, date: NaiveDate) -> Result<Vec<DailyBar>, RepositoryError> {
        Ok(self.dates.lock().await.get(&date).cloned().unwrap_or_default())
    }

    async fn stored_dates(&self) -> Result<Vec<NaiveDate>, RepositoryError> {
        Ok(self.dates.lock().await.keys().copied().collect())
    }

    async fn clear_dates(&self) -> Result<usize, RepositoryError> {
        let mut dates = self.dates.lock().await;
        let removed = dates.len();
        dates.clear();
        self.indicators.lock().await.clear();
        Ok(removed)
    }

    async fn replace_indicators(
        &self,
        date: NaiveDate,
        rows: Vec<BarIndicators>,
    ) -> Result<usize, RepositoryError> {
        let count = rows.len();
        self.indicators.lock().await.insert(date, rows);
        Ok(count)
    }

    async fn save_stock_basics(&self, basics: &[StockBasic]) -> Result<(), RepositoryError> {
        *self.basics.lock().await = basics.to_vec();
        Ok(())
    }

    async fn stock_basics(&self) -> Result<Vec<StockBasic>, RepositoryError> {
        Ok(self.basics.lock().await.clone())
    }

    async fn stats(&self) -> Result<StorageStats, RepositoryError> {
        let symbols = self.symbols.lock().await.len();
        let date_partitions = self.dates.lock().await.len();
        Ok(StorageStats {
            symbols,
            date_partitions,
            files: symbols + date_partitions,
            bytes: 0,
        })
    }
}

/// Treats any stored partition as complete.
pub struct RepositoryGapDetector {
    repository: Arc<InMemoryBarRepository>,
}

#[async_trait]
impl GapDetector for RepositoryGapDetector {
    async fn detect_gaps(
        &self,
        calendar: &[NaiveDate],
    ) -> Result<Vec<sync_domain::DataGap>, GapDetectionError> {
        let stored: Vec<NaiveDate> = self.repository.dates.lock().await.keys().copied().collect();
        Ok(detect_gaps(calendar, &stored))
    }
}

/// Keyed by mode; `history` records every accepted write in order.
#[derive(Default)]
pub struct InMemoryProgressStore {
    state: Mutex<BTreeMap<SyncMode, SyncProgress>>,
    history: Mutex<Vec<SyncProgress>>,
    writes: AtomicUsize,
}

impl InMemoryProgressStore {
    pub async fn insert(&self, progress: SyncProgress) {
        self.state.lock().await.insert(progress.mode, progress);
    }

    pub async fn snapshot(&self, mode: SyncMode) -> Option<SyncProgress> {
        self.state.lock().await.get(&mode).cloned()
    }

    pub async fn history(&self) -> Vec<SyncProgress> {
        self.history.lock().await.clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn record(&self, progress: &SyncProgress) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.history.lock().await.push(progress.clone());
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn load(&self, mode: SyncMode) -> Result<Option<SyncProgress>, ProgressError> {
        Ok(self.state.lock().await.get(&mode).cloned())
    }

    async fn load_all(&self) -> Result<Vec<SyncProgress>, ProgressError> {
        Ok(self.state.lock().await.values().cloned().collect())
    }

    async fn upsert(&self, progress: &SyncProgress) -> Result<(), ProgressError> {
        self.state
            .lock()
            .await
            .insert(progress.mode, progress.clone());
        self.record(progress).await;
        Ok(())
    }

    async fn checkpoint(&self, progress: &SyncProgress) -> Result<(), ProgressError> {
        {
            let mut state = self.state.lock().await;
            let current = state
                .get(&progress.mode)
                .ok_or_else(|| ProgressError::NotFound("checkpoint".into()))?;
            if current.job_instance_id != progress.job_instance_id {
                return Err(ProgressError::StaleInstance {
                    expected: progress.job_instance_id.clone(),
                    found: current.job_instance_id.clone(),
                });
            }
            state.insert(progress.mode, progress.clone());
        }
        self.record(progress).await;
        Ok(())
    }

    async fn clear(&self, mode: SyncMode) -> Result<(), ProgressError> {
        self.state.lock().await.remove(&mode);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMetadataStore {
    state: Mutex<Option<SyncMetadata>>,
}

impl InMemoryMetadataStore {
    pub async fn snapshot(&self) -> Option<SyncMetadata> {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn load(&self) -> Result<SyncMetadata, MetadataError> {
        Ok(self.state.lock().await.clone().unwrap_or_default())
    }

    async fn save(&self, metadata: &SyncMetadata) -> Result<(), MetadataError> {
        *self.state.lock().await = Some(metadata.clone());
        Ok(())
    }
}

pub struct StubHealthChecker {
    status: std::sync::Mutex<HealthStatus>,
    calls: AtomicUsize,
}

impl StubHealthChecker {
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status: std::sync::Mutex::new(status),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, status: HealthStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthChecker for StubHealthChecker {
    async fn check(&self, _as_of: NaiveDate) -> HealthStatus {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.status.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct StubSyncLock {
    holder: std::sync::Mutex<Option<LockInfo>>,
}

impl StubSyncLock {
    pub fn held_by(&self, info: LockInfo) {
        *self.holder.lock().unwrap() = Some(info);
    }
}

impl SyncLock for StubSyncLock {
    fn try_acquire(&self) -> Result<SyncLease, LockError> {
        match self.holder.lock().unwrap().clone() {
            Some(info) => Err(LockError::AlreadyHeld(Some(info))),
            None => Ok(SyncLease::new(())),
        }
    }

    fn holder(&self) -> Result<Option<LockInfo>, LockError> {
        Ok(self.holder.lock().unwrap().clone())
    }
}
