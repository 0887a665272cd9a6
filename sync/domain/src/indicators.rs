use crate::{DailyBar, StockCode};
use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const PRICE_WINDOWS: [usize; 4] = [5, 10, 20, 60];
pub const VOLUME_WINDOWS: [usize; 3] = [5, 10, 20];

/// Forward-adjusted (qfq) prices and moving averages for one bar.
///
/// Prices are rescaled by `adj_factor / latest_adj_factor`, so the most
/// recent bar keeps its traded price and history shifts to match it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarIndicators {
    pub trade_date: NaiveDate,
    pub code: StockCode,
    pub qfq_open: Decimal,
    pub qfq_high: Decimal,
    pub qfq_low: Decimal,
    pub qfq_close: Decimal,
    pub ma5: Option<Decimal>,
    pub ma10: Option<Decimal>,
    pub ma20: Option<Decimal>,
    pub ma60: Option<Decimal>,
    pub vma5: Option<f64>,
    pub vma10: Option<f64>,
    pub vma20: Option<f64>,
}

/// Computes indicators over one code's history. Bars are ordered by trade
/// date first; windows count bars, not calendar days.
///
/// Bars without an adjustment factor, or a history with no factor at all,
/// keep their raw prices.
pub fn compute_indicators(history: &[DailyBar]) -> Vec<BarIndicators> {
    let mut bars: Vec<&DailyBar> = history.iter().collect();
    bars.sort_by_key(|bar| bar.trade_date());

    let base = bars.iter().rev().find_map(|bar| bar.adj_factor());

    let mut closes: Vec<Decimal> = Vec::with_capacity(bars.len());
    let mut volumes: Vec<f64> = Vec::with_capacity(bars.len());
    let mut rows = Vec::with_capacity(bars.len());

    for bar in bars {
        let ratio = match (bar.adj_factor(), base) {
            (Some(factor), Some(base)) if base != 0.0 => Decimal::from_f64(factor / base),
            _ => None,
        };
        let adjust = |price: Decimal| match ratio {
            Some(ratio) => (price * ratio).round_dp(2),
            None => price.round_dp(2),
        };

        let qfq_close = adjust(bar.close());
        closes.push(qfq_close);
        volumes.push(bar.volume());

        let [ma5, ma10, ma20, ma60] = PRICE_WINDOWS.map(|n| price_average(&closes, n));
        let [vma5, vma10, vma20] = VOLUME_WINDOWS.map(|n| volume_average(&volumes, n));

        rows.push(BarIndicators {
            trade_date: bar.trade_date(),
            code: bar.code().clone(),
            qfq_open: adjust(bar.open()),
            qfq_high: adjust(bar.high()),
            qfq_low: adjust(bar.low()),
            qfq_close,
            ma5,
            ma10,
            ma20,
            ma60,
            vma5,
            vma10,
            vma20,
        });
    }

    rows
}

fn price_average(values: &[Decimal], window: usize) -> Option<Decimal> {
    if values.len() < window {
        return None;
    }
    let sum: Decimal = values[values.len() - window..].iter().sum();
    Some((sum / Decimal::from(window)).round_dp(2))
}

fn volume_average(values: &[f64], window: usize) -> Option<f64> {
    if values.len() < window {
        return None;
    }
    let sum: f64 = values[values.len() - window..].iter().sum();
    Some((sum / window as f64).round())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn bar(d: u32, close: Decimal, volume: f64, factor: Option<f64>) -> DailyBar {
        DailyBar::new(
            day(d),
            StockCode::parse("600000").unwrap(),
            close,
            close + dec!(1),
            close - dec!(1),
            close,
            volume,
            volume * 10.0,
        )
        .unwrap()
        .with_adj_factor(factor)
    }

    #[test]
    fn test_prices_are_scaled_to_latest_factor() {
        let history = vec![
            bar(6, dec!(10), 100.0, Some(1.0)),
            bar(7, dec!(10), 100.0, Some(1.0)),
            bar(8, dec!(20), 100.0, Some(2.0)),
        ];

        let rows = compute_indicators(&history);

        assert_eq!(rows[0].qfq_close, dec!(5));
        assert_eq!(rows[0].qfq_high, dec!(5.5));
        assert_eq!(rows[0].qfq_low, dec!(4.5));
        assert_eq!(rows[2].qfq_close, dec!(20));
        assert_eq!(rows[2].qfq_open, dec!(20));
    }

    #[test]
    fn test_missing_factor_keeps_raw_price_and_base_skips_it() {
        let history = vec![
            bar(6, dec!(10), 100.0, Some(1.0)),
            bar(7, dec!(12), 100.0, Some(2.0)),
            bar(8, dec!(13.456), 100.0, None),
        ];

        let rows = compute_indicators(&history);

        assert_eq!(rows[0].qfq_close, dec!(5));
        assert_eq!(rows[1].qfq_close, dec!(12));
        assert_eq!(rows[2].qfq_close, dec!(13.46));
    }

    #[test]
    fn test_moving_averages_need_a_full_window() {
        let history: Vec<DailyBar> = (1..=5)
            .map(|d| bar(d + 5, Decimal::from(d + 10), 100.0 * d as f64 + 1.0, Some(1.0)))
            .collect();

        let rows = compute_indicators(&history);

        assert!(rows[3].ma5.is_none());
        assert_eq!(rows[4].ma5, Some(dec!(13)));
        assert!(rows[4].ma10.is_none());
        assert!(rows[4].ma60.is_none());
        // (101 + 201 + 301 + 401 + 501) / 5 = 301
        assert_eq!(rows[4].vma5, Some(301.0));
        assert!(rows[4].vma10.is_none());
    }

    #[test]
    fn test_history_is_ordered_by_date() {
        let history = vec![
            bar(8, dec!(30), 100.0, Some(1.0)),
            bar(6, dec!(10), 100.0, Some(1.0)),
            bar(7, dec!(20), 100.0, Some(1.0)),
        ];

        let rows = compute_indicators(&history);
        let dates: Vec<NaiveDate> = rows.iter().map(|row| row.trade_date).collect();
        assert_eq!(dates, vec![day(6), day(7), day(8)]);
    }

    #[test]
    fn test_history_without_factors_is_unadjusted() {
        let history = vec![bar(6, dec!(10), 50.0, None), bar(7, dec!(11), 50.0, None)];

        let rows = compute_indicators(&history);
        assert_eq!(rows[0].qfq_close, dec!(10));
        assert_eq!(rows[1].qfq_close, dec!(11));
    }
}
