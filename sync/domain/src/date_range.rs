use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

const COMPACT_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::StartAfterEnd);
        }
        Ok(Self { start, end })
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// `[end - days, end]`, the window a "last N days" sync covers.
    pub fn trailing(end: NaiveDate, days: u32) -> Result<Self, DateRangeError> {
        let start = end
            .checked_sub_days(Days::new(u64::from(days)))
            .ok_or(DateRangeError::OutOfBounds)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> u32 {
        (self.end - self.start).num_days() as u32 + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    pub fn split_by_days(self) -> Vec<DateRange> {
        let mut result = Vec::new();
        let mut current = self.start;

        while current <= self.end {
            result.push(DateRange::single_day(current));
            match current.checked_add_days(Days::new(1)) {
                Some(next) => current = next,
                None => break,
            }
        }

        result
    }

    pub fn start_compact(&self) -> String {
        format_compact(self.start)
    }

    pub fn end_compact(&self) -> String {
        format_compact(self.end)
    }
}

pub fn format_compact(date: NaiveDate) -> String {
    date.format(COMPACT_FORMAT).to_string()
}

pub fn parse_compact(raw: &str) -> Result<NaiveDate, DateRangeError> {
    NaiveDate::parse_from_str(raw.trim(), COMPACT_FORMAT)
        .map_err(|_| DateRangeError::Unparseable(raw.to_string()))
}

/// Accepts `2024-01-01`, `2024/01/01` and `20240101`.
pub fn parse_flexible(raw: &str) -> Result<NaiveDate, DateRangeError> {
    let compact: String = raw.chars().filter(|c| *c != '-' && *c != '/').collect();
    parse_compact(&compact).map_err(|_| DateRangeError::Unparseable(raw.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum DateRangeError {
    #[error("Start date must be before or equal to end date")]
    StartAfterEnd,
    #[error("Date arithmetic out of bounds")]
    OutOfBounds,
    #[error("Unparseable date: '{0}'")]
    Unparseable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_valid_date_range() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let range = DateRange::new(start, end).unwrap();

        assert_eq!(range.days(), 10);
    }

    #[test]
    fn test_invalid_date_range() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        assert!(matches!(
            DateRange::new(start, end),
            Err(DateRangeError::StartAfterEnd)
        ));
    }

    #[test]
    fn test_split_by_days() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        let range = DateRange::new(start, end).unwrap();

        let days = range.split_by_days();
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].start(), start);
        assert_eq!(days[2].start(), end);
    }

    #[test]
    fn test_trailing_window() {
        let end = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let range = DateRange::trailing(end, 120).unwrap();

        assert_eq!(range.start(), NaiveDate::from_ymd_opt(2024, 11, 1).unwrap());
        assert_eq!(range.days(), 121);
        assert_eq!(range.start_compact(), "20241101");
        assert_eq!(range.end_compact(), "20250301");
    }

    #[test]
    fn test_parse_flexible_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(parse_flexible("2024-01-05").unwrap(), expected);
        assert_eq!(parse_flexible("2024/01/05").unwrap(), expected);
        assert_eq!(parse_flexible("20240105").unwrap(), expected);
        assert!(matches!(
            parse_flexible("Jan 5"),
            Err(DateRangeError::Unparseable(_))
        ));
    }
}
