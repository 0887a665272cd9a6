use chrono::NaiveDate;
use rust_decimal_macros::dec;
use shaku::{module, HasComponent};
use std::path::Path;
use std::sync::Arc;
use sync_application::{BarRepository, GapDetector};
use sync_domain::{compute_indicators, BarMetrics, DailyBar, StockBasic, StockCode};
use sync_infrastructure::detectors::ParquetGapDetectorParameters;
use sync_infrastructure::repositories::ParquetBarRepositoryParameters;
use sync_infrastructure::{ParquetBarRepository, ParquetGapDetector};
use tokio::sync::Mutex;

module! {
    StorageModule {
        components = [
            ParquetBarRepository,
            ParquetGapDetector,
        ],
        providers = []
    }
}

fn storage(dir: &Path) -> StorageModule {
    StorageModule::builder()
        .with_component_parameters::<ParquetBarRepository>(ParquetBarRepositoryParameters {
            data_dir: dir.to_path_buf(),
            write_lock: Mutex::new(()),
        })
        .with_component_parameters::<ParquetGapDetector>(ParquetGapDetectorParameters {
            data_dir: dir.to_path_buf(),
        })
        .build()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

fn code(raw: &str) -> StockCode {
    StockCode::parse(raw).unwrap()
}

fn bar(raw: &str, date: NaiveDate, close: rust_decimal::Decimal) -> DailyBar {
    DailyBar::new(
        date,
        code(raw),
        dec!(10.00),
        dec!(11.50),
        dec!(9.80),
        close,
        15_300.0,
        16_524.12,
    )
    .unwrap()
    .with_adj_factor(Some(1.237))
}

#[tokio::test]
async fn symbol_history_round_trips_every_column() {
    let dir = tempfile::tempdir().unwrap();
    let module = storage(dir.path());
    let repo: Arc<dyn BarRepository> = module.resolve();

    let enriched = bar("600519", day(2), dec!(10.8765))
        .with_previous_close(Some(dec!(10.5)), Some(dec!(0.3765)), Some(dec!(3.5857)))
        .with_metrics(BarMetrics {
            turnover_rate: Some(0.42),
            pe_ttm: Some(28.1),
            total_mv: Some(21_000_000.0),
            ..BarMetrics::default()
        });
    let plain = bar("600519", day(3), dec!(11.00)).with_adj_factor(None);

    let outcome = repo
        .upsert_symbol(&code("600519"), vec![plain.clone(), enriched.clone()])
        .await
        .unwrap();
    assert_eq!(outcome.inserted, 2);
    assert_eq!(outcome.total, 2);

    let stored =
        ParquetBarRepository::read_bars(&dir.path().join("stocks").join("600519.parquet")).unwrap();
    assert_eq!(stored, vec![enriched, plain]);
    assert_eq!(stored[0].metrics().pe, None);
    assert!(!stored[1].has_adj_factor());
}

#[tokio::test]
async fn upsert_replaces_existing_dates_and_appends_new_ones() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ParquetBarRepository::new(dir.path());
    let code = code("000001");

    repo.upsert_symbol(&code, vec![bar("000001", day(2), dec!(10.1)), bar("000001", day(3), dec!(10.2))])
        .await
        .unwrap();
    let outcome = repo
        .upsert_symbol(&code, vec![bar("000001", day(3), dec!(10.9)), bar("000001", day(6), dec!(11.0))])
        .await
        .unwrap();

    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.total, 3);
    assert_eq!(repo.last_trade_date(&code).await.unwrap(), Some(day(6)));

    let stored = ParquetBarRepository::read_bars(&dir.path().join("stocks/000001.parquet")).unwrap();
    let closes: Vec<_> = stored.iter().map(|b| b.close()).collect();
    assert_eq!(closes, vec![dec!(10.1), dec!(10.9), dec!(11.0)]);
}

#[tokio::test]
async fn bars_for_another_code_are_not_merged() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ParquetBarRepository::new(dir.path());

    let outcome = repo
        .upsert_symbol(
            &code("000001"),
            vec![bar("000001", day(2), dec!(10)), bar("600000", day(2), dec!(8))],
        )
        .await
        .unwrap();

    assert_eq!(outcome.inserted, 1);
    assert_eq!(repo.stored_codes().await.unwrap(), vec![code("000001")]);
}

#[tokio::test]
async fn missing_symbol_has_no_last_date() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ParquetBarRepository::new(dir.path());
    assert_eq!(repo.last_trade_date(&code("000002")).await.unwrap(), None);
    assert!(repo.stored_codes().await.unwrap().is_empty());
}

#[tokio::test]
async fn date_partitions_are_replaced_listed_and_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ParquetBarRepository::new(dir.path());

    let written = repo
        .replace_date(
            day(2),
            vec![
                bar("600000", day(2), dec!(8)),
                bar("000001", day(2), dec!(10)),
                bar("000001", day(2), dec!(10)),
                bar("000001", day(3), dec!(10)),
            ],
        )
        .await
        .unwrap();
    assert_eq!(written, 2);

    repo.replace_date(day(3), vec![bar("000001", day(3), dec!(10))])
        .await
        .unwrap();
    assert_eq!(repo.stored_dates().await.unwrap(), vec![day(2), day(3)]);

    let partition =
        ParquetBarRepository::read_bars(&dir.path().join("daily").join("20250102.parquet")).unwrap();
    let codes: Vec<_> = partition.iter().map(|b| b.code().as_str().to_string()).collect();
    assert_eq!(codes, vec!["000001", "600000"]);

    assert_eq!(repo.clear_dates().await.unwrap(), 2);
    assert!(repo.stored_dates().await.unwrap().is_empty());
}

#[tokio::test]
async fn indicator_partitions_round_trip_and_clear_with_dates() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ParquetBarRepository::new(dir.path());

    let history: Vec<DailyBar> = (2..=8)
        .map(|d| bar("600000", day(d), rust_decimal::Decimal::from(d + 8)))
        .collect();
    for row in &history {
        repo.replace_date(row.trade_date(), vec![row.clone()])
            .await
            .unwrap();
    }
    assert_eq!(repo.date_bars(day(8)).await.unwrap(), vec![history[6].clone()]);
    assert!(repo.date_bars(day(9)).await.unwrap().is_empty());

    let rows = compute_indicators(&history);
    let last = rows.last().unwrap().clone();
    assert_eq!(last.ma5, Some(dec!(14)));
    assert_eq!(
        repo.replace_indicators(day(8), rows.clone()).await.unwrap(),
        1
    );

    let path = dir.path().join("indicators").join("20250108.parquet");
    let stored = ParquetBarRepository::read_indicators(&path).unwrap();
    assert_eq!(stored, vec![last]);
    assert!(ParquetBarRepository::read_bars(&path).is_err());

    assert_eq!(repo.clear_dates().await.unwrap(), 7);
    assert!(!path.exists());
}

#[tokio::test]
async fn stock_basics_and_stats_reflect_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ParquetBarRepository::new(dir.path());
    assert!(repo.stock_basics().await.unwrap().is_empty());

    let mut basic = StockBasic::new(code("600519"), "贵州茅台");
    basic.list_date = Some(NaiveDate::from_ymd_opt(2001, 8, 27).unwrap());
    repo.save_stock_basics(&[basic.clone()]).await.unwrap();
    assert_eq!(repo.stock_basics().await.unwrap(), vec![basic]);

    repo.upsert_symbol(&code("600519"), vec![bar("600519", day(2), dec!(10))])
        .await
        .unwrap();
    repo.replace_date(day(2), vec![bar("600519", day(2), dec!(10))])
        .await
        .unwrap();

    let stats = repo.stats().await.unwrap();
    assert_eq!(stats.symbols, 1);
    assert_eq!(stats.date_partitions, 1);
    assert_eq!(stats.files, 2);
    assert!(stats.bytes > 0);
}

#[tokio::test]
async fn corrupt_partition_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let stocks = dir.path().join("stocks");
    std::fs::create_dir_all(&stocks).unwrap();
    std::fs::write(stocks.join("000001.parquet"), b"not parquet").unwrap();

    let repo = ParquetBarRepository::new(dir.path());
    let err = repo.last_trade_date(&code("000001")).await.unwrap_err();
    assert!(matches!(err, sync_application::RepositoryError::CorruptFile { .. }));
}

#[tokio::test]
async fn gap_detector_flags_missing_and_incomplete_partitions() {
    let dir = tempfile::tempdir().unwrap();
    let module = storage(dir.path());
    let repo: Arc<dyn BarRepository> = module.resolve();
    let detector: Arc<dyn GapDetector> = module.resolve();

    let calendar = vec![day(2), day(3), day(6), day(7), day(8)];

    repo.replace_date(day(2), vec![bar("000001", day(2), dec!(10))])
        .await
        .unwrap();
    // No adjustment factor: stored but not complete.
    repo.replace_date(day(6), vec![bar("000001", day(6), dec!(10)).with_adj_factor(None)])
        .await
        .unwrap();
    repo.replace_date(day(7), Vec::new()).await.unwrap();
    repo.replace_date(day(8), vec![bar("000001", day(8), dec!(10))])
        .await
        .unwrap();

    let gaps = detector.detect_gaps(&calendar).await.unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].trading_days(), 3);
    assert_eq!(gaps[0].range().start(), day(3));
    assert_eq!(gaps[0].range().end(), day(7));
}

#[tokio::test]
async fn gap_detector_treats_unreadable_partition_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    let daily = dir.path().join("daily");
    std::fs::create_dir_all(&daily).unwrap();
    std::fs::write(daily.join("20250102.parquet"), b"garbage").unwrap();

    let detector = ParquetGapDetector::new(dir.path());
    let gaps = detector.detect_gaps(&[day(2)]).await.unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].range().start(), day(2));
    assert_eq!(gaps[0].trading_days(), 1);
}

#[tokio::test]
async fn gap_detector_without_daily_dir_reports_whole_calendar() {
    let dir = tempfile::tempdir().unwrap();
    let detector = ParquetGapDetector::new(dir.path());
    let gaps = detector.detect_gaps(&[day(2), day(3)]).await.unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].trading_days(), 2);
}
