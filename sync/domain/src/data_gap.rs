use crate::DateRange;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A run of consecutive trading days with no local data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataGap {
    range: DateRange,
    trading_days: usize,
}

impl DataGap {
    pub fn new(range: DateRange, trading_days: usize) -> Self {
        Self {
            range,
            trading_days,
        }
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }

    /// Number of trading days inside the gap, not calendar days.
    pub fn trading_days(&self) -> usize {
        self.trading_days
    }
}

/// `calendar` must be sorted ascending; dates absent from it never open or
/// close a gap.
pub fn detect_gaps(calendar: &[NaiveDate], existing_dates: &[NaiveDate]) -> Vec<DataGap> {
    let existing: HashSet<&NaiveDate> = existing_dates.iter().collect();
    let mut gaps = Vec::new();
    let mut current_gap: Option<(NaiveDate, NaiveDate, usize)> = None;

    for date in calendar {
        if existing.contains(date) {
            if let Some(gap) = current_gap.take() {
                gaps.push(close_gap(gap));
            }
            continue;
        }

        match current_gap.as_mut() {
            Some((_, last, count)) => {
                *last = *date;
                *count += 1;
            }
            None => {
                current_gap = Some((*date, *date, 1));
            }
        }
    }

    if let Some(gap) = current_gap {
        gaps.push(close_gap(gap));
    }

    gaps
}

fn close_gap((start, end, count): (NaiveDate, NaiveDate, usize)) -> DataGap {
    let range = DateRange::new(start, end).expect("Gap range should be valid");
    DataGap::new(range, count)
}
