use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::Serialize;
use shaku::{Component, Interface};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sync_domain::{
    compute_indicators, BarIndicators, DailyBar, DataGap, DateRange, DateRangeError, StockCode,
};
use tokio::sync::Notify;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::gap_detector::{GapDetectionError, GapDetector};
use crate::health::{HealthChecker, HealthStatus};
use crate::metadata::{MetadataError, MetadataStore, SyncMetadata};
use crate::ports::{BarRepository, GatewayError, MarketDataGateway, RepositoryError};
use crate::progress::{JobStatus, ProgressError, ProgressStore, SyncMode, SyncProgress};
use crate::sync_lock::{LockError, SyncLease, SyncLock};

#[async_trait]
pub trait SyncService: Interface {
    /// Per-symbol history for the whole listed universe, resumable.
    async fn full_sync(&self, request: FullSyncRequest) -> Result<SyncReport, SyncError>;

    /// Brings every locally stored symbol up to `end_date`.
    async fn incremental_sync(&self, request: IncrementalRequest)
        -> Result<SyncReport, SyncError>;

    /// Whole-market partitions, one trading day per upstream request.
    async fn sync_by_date(&self, request: DateSyncRequest) -> Result<SyncReport, SyncError>;

    /// Honoured between symbols and dates, and interrupts cooldowns.
    fn request_stop(&self);
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub default_days: u32,
    pub max_consecutive_failures: u32,
    pub cooldown: Duration,
    pub health_check_interval: usize,
    pub checkpoint_interval: usize,
    pub heartbeat_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            default_days: 120,
            max_consecutive_failures: 5,
            cooldown: Duration::from_secs(10 * 60),
            health_check_interval: 100,
            checkpoint_interval: 50,
            heartbeat_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FullSyncRequest {
    pub days: u32,
    pub end_date: NaiveDate,
    pub resume: bool,
}

#[derive(Debug, Clone)]
pub struct IncrementalRequest {
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct DateSyncRequest {
    pub range: DateRange,
    pub force: bool,
}

#[derive(Clone, Default)]
pub struct StopFlag {
    inner: Arc<StopState>,
}

#[derive(Default)]
struct StopState {
    requested: AtomicBool,
    notify: Notify,
}

impl StopFlag {
    pub fn request(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.inner.requested.store(false, Ordering::SeqCst);
    }

    /// Sleeps for `duration`; returns false if a stop request cut it short.
    async fn sleep(&self, duration: Duration) -> bool {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_requested() {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_requested(),
            _ = notified => false,
        }
    }
}

#[derive(Component)]
#[shaku(interface = SyncService)]
pub struct SyncServiceImpl {
    #[shaku(inject)]
    gateway: Arc<dyn MarketDataGateway>,

    #[shaku(inject)]
    repository: Arc<dyn BarRepository>,

    #[shaku(inject)]
    progress_store: Arc<dyn ProgressStore>,

    #[shaku(inject)]
    metadata_store: Arc<dyn MetadataStore>,

    #[shaku(inject)]
    health_checker: Arc<dyn HealthChecker>,

    #[shaku(inject)]
    gap_detector: Arc<dyn GapDetector>,

    #[shaku(inject)]
    sync_lock: Arc<dyn SyncLock>,

    settings: SyncSettings,
    stop: StopFlag,
}

impl SyncServiceImpl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<dyn MarketDataGateway>,
        repository: Arc<dyn BarRepository>,
        progress_store: Arc<dyn ProgressStore>,
        metadata_store: Arc<dyn MetadataStore>,
        health_checker: Arc<dyn HealthChecker>,
        gap_detector: Arc<dyn GapDetector>,
        sync_lock: Arc<dyn SyncLock>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            gateway,
            repository,
            progress_store,
            metadata_store,
            health_checker,
            gap_detector,
            sync_lock,
            settings,
            stop: StopFlag::default(),
        }
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    fn acquire_lock(&self) -> Result<SyncLease, SyncError> {
        self.sync_lock.try_acquire().map_err(|e| match e {
            LockError::AlreadyHeld(Some(info)) => {
                SyncError::AlreadyRunning(format!("pid {} since {}", info.pid, info.start_time))
            }
            LockError::AlreadyHeld(None) => SyncError::AlreadyRunning("another process".into()),
            other => SyncError::Lock(other),
        })
    }

    async fn initialize_progress(
        &self,
        mode: SyncMode,
        range: &DateRange,
        resume: bool,
    ) -> Result<SyncProgress, SyncError> {
        let now = Utc::now();
        let timeout = ChronoDuration::from_std(self.settings.heartbeat_timeout)
            .unwrap_or_else(|_| ChronoDuration::seconds(300));

        let mut progress =
            SyncProgress::new(Uuid::new_v4().to_string(), mode, Some(range.clone()), now);

        if let Some(previous) = self.progress_store.load(mode).await? {
            if previous.is_live(now, timeout) {
                return Err(SyncError::AlreadyRunning(previous.job_instance_id));
            }

            if resume {
                info!(
                    "Resuming {} sync started at {}: {} symbols already completed",
                    mode,
                    previous.start_time,
                    previous.completed_codes.len()
                );
                if previous.range.as_ref() != Some(range) {
                    info!("Sync window moved since the checkpoint was written");
                }
                progress.start_time = previous.start_time;
                progress.completed_codes = previous.completed_codes;
                progress.completed_dates = previous.completed_dates;
            } else {
                info!(
                    "Discarding {} checkpoint from {} ({})",
                    previous.mode, previous.start_time, previous.status
                );
            }
        }

        self.progress_store.upsert(&progress).await?;
        Ok(progress)
    }

    async fn checkpoint(&self, progress: &mut SyncProgress) -> Result<(), SyncError> {
        progress.heartbeat_at = Utc::now();
        self.progress_store.checkpoint(progress).await?;
        Ok(())
    }

    async fn finalize(
        &self,
        mut progress: SyncProgress,
        report: &SyncReport,
    ) -> Result<(), SyncError> {
        progress.status = report.final_status();
        if let Some(reason) = &report.aborted_reason {
            progress.last_error = Some(reason.clone());
        }
        self.checkpoint(&mut progress).await?;

        if progress.status == JobStatus::Completed {
            self.progress_store.clear(progress.mode).await?;
            info!("Sync completed cleanly, checkpoint cleared");
        } else {
            info!(
                "Checkpoint kept with status {} for the next run",
                progress.status
            );
        }
        Ok(())
    }

    async fn refresh_metadata<F>(&self, mode: SyncMode, update: F) -> Result<(), SyncError>
    where
        F: FnOnce(&mut SyncMetadata) + Send,
    {
        let stats = self.repository.stats().await?;
        let dates = self.repository.stored_dates().await?;
        let mut metadata = self.metadata_store.load().await?;

        metadata.last_sync_date = Some(Utc::now());
        metadata.last_mode = Some(mode);
        metadata.total_stocks = stats.symbols;
        metadata.date_partitions = dates.len();
        metadata.partition_range = match (dates.first(), dates.last()) {
            (Some(first), Some(last)) => DateRange::new(*first, *last).ok(),
            _ => None,
        };
        update(&mut metadata);

        self.metadata_store.save(&metadata).await?;
        Ok(())
    }

    async fn sync_symbol(&self, code: &StockCode, range: &DateRange) -> SymbolOutcome {
        match self.try_sync_symbol(code, range).await {
            Ok(outcome) => outcome,
            Err(e) => SymbolOutcome::Failed(e.to_string()),
        }
    }

    async fn try_sync_symbol(
        &self,
        code: &StockCode,
        range: &DateRange,
    ) -> Result<SymbolOutcome, SyncError> {
        let last_date = self.repository.last_trade_date(code).await?;

        let fetch_range = match last_date {
            Some(last) if last >= range.end() => return Ok(SymbolOutcome::Skipped),
            Some(last) => match last.succ_opt() {
                Some(next) => DateRange::new(next, range.end())?,
                None => return Ok(SymbolOutcome::Skipped),
            },
            None => range.clone(),
        };

        let bars = self.gateway.daily_bars_for_symbol(code, &fetch_range).await?;
        let fetched = bars.len();

        match (last_date, fetched) {
            (None, 0) => Ok(SymbolOutcome::Failed("no data returned".to_string())),
            (Some(_), 0) => Ok(SymbolOutcome::Skipped),
            (None, _) => {
                self.repository.upsert_symbol(code, bars).await?;
                Ok(SymbolOutcome::New(fetched))
            }
            (Some(_), _) => {
                self.repository.upsert_symbol(code, bars).await?;
                Ok(SymbolOutcome::Updated(fetched))
            }
        }
    }

    async fn cool_down(&self, as_of: NaiveDate) -> Cooldown {
        warn!(
            "Cooling down for {:?} before probing the upstream again",
            self.settings.cooldown
        );
        if !self.stop.sleep(self.settings.cooldown).await {
            return Cooldown::Interrupted;
        }

        match self.health_checker.check(as_of).await {
            HealthStatus::Healthy => Cooldown::Recovered,
            HealthStatus::Degraded(reason) => Cooldown::StillDegraded(reason),
        }
    }

    async fn run_symbols(
        &self,
        codes: &[StockCode],
        range: &DateRange,
        mut progress: Option<&mut SyncProgress>,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let as_of = range.end();
        let health_interval = self.settings.health_check_interval.max(1);
        let checkpoint_interval = self.settings.checkpoint_interval.max(1);
        let mut failure_streak = 0u32;

        for (index, code) in codes.iter().enumerate() {
            if self.stop.is_requested() {
                warn!(
                    "Stop requested, halting after {} of {} symbols",
                    index,
                    codes.len()
                );
                report.interrupted = true;
                break;
            }

            if (index + 1) % health_interval == 0 {
                info!("Running upstream health check");
                if let HealthStatus::Degraded(reason) = self.health_checker.check(as_of).await {
                    warn!("Upstream degraded: {}", reason);
                    if !self.stop.sleep(self.settings.cooldown).await {
                        report.interrupted = true;
                        break;
                    }
                }
            }

            let outcome = self.sync_symbol(code, range).await;
            report.record(code, &outcome);

            match &outcome {
                SymbolOutcome::Failed(message) => {
                    failure_streak += 1;
                    warn!("{} failed: {}", code, message);
                    if let Some(progress) = progress.as_deref_mut() {
                        progress.mark_failed(code, message);
                    }
                }
                _ => {
                    failure_streak = 0;
                    if let Some(progress) = progress.as_deref_mut() {
                        progress.mark_completed(code);
                    }
                }
            }

            if failure_streak >= self.settings.max_consecutive_failures {
                warn!(
                    "{} consecutive failures, assuming the upstream is throttling",
                    failure_streak
                );
                if let Some(progress) = progress.as_deref_mut() {
                    self.checkpoint(progress).await?;
                }

                match self.cool_down(as_of).await {
                    Cooldown::Recovered => failure_streak = 0,
                    Cooldown::Interrupted => {
                        report.interrupted = true;
                        break;
                    }
                    Cooldown::StillDegraded(reason) => {
                        error!("Upstream still unavailable after cooldown, try again later");
                        report.aborted_reason =
                            Some(format!("upstream still throttled after cooldown: {reason}"));
                        break;
                    }
                }
            }

            if (index + 1) % checkpoint_interval == 0 {
                info!(
                    "Progress {}/{}: {} new, {} updated, {} skipped, {} failed",
                    index + 1,
                    codes.len(),
                    report.new,
                    report.updated,
                    report.skipped,
                    report.failed
                );
                if let Some(progress) = progress.as_deref_mut() {
                    self.checkpoint(progress).await?;
                }
            }
        }

        Ok(())
    }

    async fn sync_date(
        &self,
        date: NaiveDate,
        known_codes: &mut HashSet<StockCode>,
        basics_refreshed: &mut bool,
    ) -> Result<usize, SyncError> {
        let bars = self.gateway.daily_bars_for_date(date).await?;
        if bars.is_empty() {
            warn!("No bars published for {}", date);
            return Ok(0);
        }

        if !*basics_refreshed && bars.iter().any(|bar| !known_codes.contains(bar.code())) {
            let basics = self.gateway.stock_list().await?;
            info!(
                "New listings seen on {}, refreshing {} stock basics",
                date,
                basics.len()
            );
            self.repository.save_stock_basics(&basics).await?;
            *known_codes = basics.into_iter().map(|basic| basic.code).collect();
            *basics_refreshed = true;
        }

        Ok(self.repository.replace_date(date, bars).await?)
    }

    async fn run_dates(
        &self,
        dates: &[NaiveDate],
        as_of: NaiveDate,
        progress: &mut SyncProgress,
        report: &mut SyncReport,
    ) -> Result<bool, SyncError> {
        let mut known_codes: HashSet<StockCode> = self
            .repository
            .stock_basics()
            .await?
            .into_iter()
            .map(|basic| basic.code)
            .collect();
        let mut basics_refreshed = false;
        let mut failure_streak = 0u32;

        for (index, date) in dates.iter().enumerate() {
            if self.stop.is_requested() {
                warn!("Stop requested, halting before {}", date);
                report.interrupted = true;
                break;
            }

            match self
                .sync_date(*date, &mut known_codes, &mut basics_refreshed)
                .await
            {
                Ok(rows) => {
                    failure_streak = 0;
                    report.dates += 1;
                    report.records += rows;
                    progress.completed_dates.insert(*date);
                    info!(
                        "[{}/{}] {}: {} rows, {} total",
                        index + 1,
                        dates.len(),
                        date,
                        rows,
                        report.records
                    );
                }
                Err(e) => {
                    failure_streak += 1;
                    let message = e.to_string();
                    error!("Failed to sync {}: {}", date, message);
                    report.failed += 1;
                    report.failed_dates.push((*date, message.clone()));
                    progress.last_error = Some(message);
                }
            }

            self.checkpoint(progress).await?;

            if failure_streak >= self.settings.max_consecutive_failures {
                match self.cool_down(as_of).await {
                    Cooldown::Recovered => failure_streak = 0,
                    Cooldown::Interrupted => {
                        report.interrupted = true;
                        break;
                    }
                    Cooldown::StillDegraded(reason) => {
                        report.aborted_reason =
                            Some(format!("upstream still throttled after cooldown: {reason}"));
                        break;
                    }
                }
            }
        }

        Ok(basics_refreshed)
    }

    /// Picks up renamed securities; a failure keeps the saved basics.
    async fn refresh_stock_basics(&self) {
        let basics = match self.gateway.stock_list().await {
            Ok(basics) if basics.is_empty() => {
                warn!("Upstream returned an empty stock list, keeping saved basics");
                return;
            }
            Ok(basics) => basics,
            Err(e) => {
                warn!("Failed to refresh stock basics: {}", e);
                return;
            }
        };

        match self.repository.save_stock_basics(&basics).await {
            Ok(()) => info!("Refreshed {} stock basics", basics.len()),
            Err(e) => warn!("Failed to save stock basics: {}", e),
        }
    }

    /// Rebuilds the indicator partition of every stored date from the date
    /// partitions. Returns the number of partitions written.
    async fn recompute_indicators(&self) -> Result<usize, SyncError> {
        let dates = self.repository.stored_dates().await?;

        let mut histories: HashMap<StockCode, Vec<DailyBar>> = HashMap::new();
        for date in &dates {
            for bar in self.repository.date_bars(*date).await? {
                histories.entry(bar.code().clone()).or_default().push(bar);
            }
        }

        let mut by_date: BTreeMap<NaiveDate, Vec<BarIndicators>> =
            dates.iter().map(|date| (*date, Vec::new())).collect();
        for history in histories.values() {
            for row in compute_indicators(history) {
                by_date.entry(row.trade_date).or_default().push(row);
            }
        }

        let mut written = 0;
        for (date, mut rows) in by_date {
            rows.sort_by(|a, b| a.code.cmp(&b.code));
            self.repository.replace_indicators(date, rows).await?;
            written += 1;
        }

        info!(
            "Indicators recomputed for {} symbols over {} dates",
            histories.len(),
            written
        );
        Ok(written)
    }
}

#[async_trait]
impl SyncService for SyncServiceImpl {
    async fn full_sync(&self, request: FullSyncRequest) -> Result<SyncReport, SyncError> {
        let _lease = self.acquire_lock()?;
        self.stop.reset();

        let range = DateRange::trailing(request.end_date, request.days)?;
        info!(
            "Starting full sync {} ~ {} ({} days, resume={})",
            range.start(),
            range.end(),
            request.days,
            request.resume
        );

        let universe = self.gateway.stock_list().await?;
        if universe.is_empty() {
            return Err(SyncError::EmptyUniverse);
        }
        info!("Upstream lists {} securities", universe.len());
        self.repository.save_stock_basics(&universe).await?;

        let mut progress = self
            .initialize_progress(SyncMode::Full, &range, request.resume)
            .await?;

        let pending: Vec<StockCode> = universe
            .into_iter()
            .map(|basic| basic.code)
            .filter(|code| !progress.completed_codes.contains(code))
            .collect();
        info!(
            "{} symbols pending, {} already completed",
            pending.len(),
            progress.completed_codes.len()
        );

        let mut report = SyncReport::new(SyncMode::Full, Some(range.clone()));
        self.run_symbols(&pending, &range, Some(&mut progress), &mut report)
            .await?;
        report.log_summary();

        let days = request.days;
        let window = range.clone();
        self.refresh_metadata(SyncMode::Full, move |metadata| {
            metadata.days = days;
            metadata.date_range = Some(window);
        })
        .await?;

        self.finalize(progress, &report).await?;
        Ok(report)
    }

    async fn incremental_sync(
        &self,
        request: IncrementalRequest,
    ) -> Result<SyncReport, SyncError> {
        let _lease = self.acquire_lock()?;
        self.stop.reset();

        let codes = self.repository.stored_codes().await?;
        if codes.is_empty() {
            return Err(SyncError::NothingToUpdate);
        }

        let range = DateRange::trailing(request.end_date, self.settings.default_days)?;
        info!(
            "Starting incremental sync of {} stored symbols up to {}",
            codes.len(),
            request.end_date
        );

        let mut report = SyncReport::new(SyncMode::Incremental, Some(range.clone()));
        self.run_symbols(&codes, &range, None, &mut report).await?;
        report.log_summary();

        let end = request.end_date;
        self.refresh_metadata(SyncMode::Incremental, move |metadata| {
            let window = match metadata.date_range.take() {
                Some(previous) => DateRange::new(previous.start(), end).unwrap_or(previous),
                None => range,
            };
            metadata.date_range = Some(window);
        })
        .await?;

        Ok(report)
    }

    async fn sync_by_date(&self, request: DateSyncRequest) -> Result<SyncReport, SyncError> {
        let _lease = self.acquire_lock()?;
        self.stop.reset();

        let range = request.range;
        let calendar = self.gateway.trading_calendar(&range).await?;
        let (first, last) = match (calendar.first(), calendar.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(SyncError::EmptyCalendar),
        };
        info!(
            "Trading calendar {} ~ {}: {} open days",
            first,
            last,
            calendar.len()
        );

        let mut progress = self
            .initialize_progress(SyncMode::ByDate, &range, false)
            .await?;
        let mut report = SyncReport::new(SyncMode::ByDate, Some(range.clone()));

        let dates = if request.force {
            let removed = self.repository.clear_dates().await?;
            warn!("Force mode: removed {} existing date partitions", removed);
            calendar.clone()
        } else {
            let gaps = self.gap_detector.detect_gaps(&calendar).await?;
            for gap in &gaps {
                info!(
                    "Missing {} trading days {} ~ {}",
                    gap.trading_days(),
                    gap.range().start(),
                    gap.range().end()
                );
            }
            plan_dates_to_process(&calendar, &gaps)
        };
        report.skipped = calendar.len() - dates.len();

        if dates.is_empty() {
            info!("Every trading day in range is already complete");
        } else {
            let basics_refreshed = self
                .run_dates(&dates, range.end(), &mut progress, &mut report)
                .await?;
            if !basics_refreshed && !report.interrupted {
                self.refresh_stock_basics().await;
            }
        }

        if report.interrupted {
            info!("Skipping indicator recomputation for the interrupted run");
        } else {
            match self.recompute_indicators().await {
                Ok(partitions) => report.indicator_dates = partitions,
                Err(e) => error!("Indicator recomputation failed: {}", e),
            }
        }
        report.log_summary();

        self.refresh_metadata(SyncMode::ByDate, |_| {}).await?;
        self.finalize(progress, &report).await?;
        Ok(report)
    }

    fn request_stop(&self) {
        info!("Stop requested, finishing the current request");
        self.stop.request();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolOutcome {
    New(usize),
    Updated(usize),
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub range: Option<DateRange>,
    pub new: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub records: usize,
    pub dates: usize,
    pub indicator_dates: usize,
    pub interrupted: bool,
    pub aborted_reason: Option<String>,
    pub failed_codes: Vec<StockCode>,
    pub failed_dates: Vec<(NaiveDate, String)>,
}

impl SyncReport {
    pub fn new(mode: SyncMode, range: Option<DateRange>) -> Self {
        Self {
            mode,
            range,
            new: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            records: 0,
            dates: 0,
            indicator_dates: 0,
            interrupted: false,
            aborted_reason: None,
            failed_codes: Vec::new(),
            failed_dates: Vec::new(),
        }
    }

    fn record(&mut self, code: &StockCode, outcome: &SymbolOutcome) {
        match outcome {
            SymbolOutcome::New(rows) => {
                self.new += 1;
                self.records += rows;
            }
            SymbolOutcome::Updated(rows) => {
                self.updated += 1;
                self.records += rows;
            }
            SymbolOutcome::Skipped => self.skipped += 1,
            SymbolOutcome::Failed(_) => {
                self.failed += 1;
                self.failed_codes.push(code.clone());
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && !self.interrupted && self.aborted_reason.is_none()
    }

    pub fn final_status(&self) -> JobStatus {
        if self.interrupted {
            JobStatus::Interrupted
        } else if self.is_clean() {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        }
    }

    fn log_summary(&self) {
        info!(
            "{} sync finished: {} new, {} updated, {} skipped, {} failed, {} dates, {} records",
            self.mode, self.new, self.updated, self.skipped, self.failed, self.dates, self.records
        );
        if self.interrupted {
            warn!("Run was interrupted; rerun to resume");
        }
        if let Some(reason) = &self.aborted_reason {
            warn!("Run aborted: {}", reason);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Another sync is already running: {0}")]
    AlreadyRunning(String),

    #[error("Upstream returned an empty stock list")]
    EmptyUniverse,

    #[error("Upstream returned no trading days for the requested range")]
    EmptyCalendar,

    #[error("No local data to update; run a full sync first")]
    NothingToUpdate,

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Checkpoint error: {0}")]
    Progress(#[from] ProgressError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    #[error("Gap detection error: {0}")]
    GapDetection(#[from] GapDetectionError),

    #[error("Invalid date range: {0}")]
    DateRange(#[from] DateRangeError),
}

enum Cooldown {
    Recovered,
    Interrupted,
    StillDegraded(String),
}

fn plan_dates_to_process(calendar: &[NaiveDate], gaps: &[DataGap]) -> Vec<NaiveDate> {
    let mut dates = BTreeSet::new();

    for gap in gaps {
        for date in calendar {
            if gap.range().contains(*date) {
                dates.insert(*date);
            }
        }
    }

    dates.into_iter().collect()
}
