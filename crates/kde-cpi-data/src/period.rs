//! Period keys and calendar months.
//!
//! BLS identifies a point in time by a year and a period code: `M01`..`M12`
//! for months, `M13` for the annual average, `S01`..`S03` for semiannual
//! figures. [`PeriodKey`] orders such pairs chronologically within a year by
//! the numeric part of the code.

use std::{cmp::Ordering, fmt};

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::DataError;

/// A `(year, period code)` pair with a normalized code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    pub year: i32,
    pub period: String,
}

impl PeriodKey {
    /// Creates a key, trimming and upper-casing the period code.
    #[must_use]
    pub fn new(year: i32, period: &str) -> Self {
        Self {
            year,
            period: normalize_period(period),
        }
    }

    /// Numeric part of the period code, or 0 when it has none.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kde_cpi_data::period::PeriodKey;
    /// assert_eq!(PeriodKey::new(2024, "M07").rank(), 7);
    /// assert_eq!(PeriodKey::new(2024, "S02").rank(), 2);
    /// assert_eq!(PeriodKey::new(2024, "AN").rank(), 0);
    /// ```
    #[must_use]
    pub fn rank(&self) -> u32 {
        let mut chars = self.period.chars();
        if chars.next().is_none() {
            return 0;
        }
        let digits = chars.as_str();
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            digits.parse().unwrap_or(0)
        } else {
            0
        }
    }

    /// The same period one year earlier.
    #[must_use]
    pub fn previous_year(&self) -> Self {
        Self {
            year: self.year - 1,
            period: self.period.clone(),
        }
    }
}

impl Ord for PeriodKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.year
            .cmp(&other.year)
            .then_with(|| self.rank().cmp(&other.rank()))
            .then_with(|| self.period.cmp(&other.period))
    }
}

impl PartialOrd for PeriodKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_period_label(self))
    }
}

/// Trims and upper-cases a period code.
#[must_use]
pub fn normalize_period(period: &str) -> String {
    period.trim().to_ascii_uppercase()
}

/// Human-readable label of a period key.
///
/// Monthly codes become `YYYY-MM`; anything else is `YYYY-CODE`.
///
/// # Examples
///
/// ```
/// # use kde_cpi_data::period::{PeriodKey, format_period_label};
/// assert_eq!(format_period_label(&PeriodKey::new(2024, "m3")), "2024-03");
/// assert_eq!(format_period_label(&PeriodKey::new(2024, "S01")), "2024-S01");
/// ```
#[must_use]
pub fn format_period_label(key: &PeriodKey) -> String {
    let monthly = key.period.starts_with('M')
        && key.period.len() > 1
        && key.period[1..].bytes().all(|b| b.is_ascii_digit());
    if monthly {
        format!("{}-{:02}", key.year, key.rank())
    } else {
        format!("{}-{}", key.year, key.period)
    }
}

/// A calendar month, parsed from `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(NaiveDate);

impl Month {
    /// Parses a `YYYY-MM` string.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kde_cpi_data::period::Month;
    /// let month = Month::parse("2024-06").unwrap();
    /// assert_eq!(month.year(), 2024);
    /// assert_eq!(month.period_code(), "M06");
    /// assert_eq!(month.to_string(), "2024-06");
    /// assert!(Month::parse("June 2024").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self, DataError> {
        NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| DataError::InvalidMonth {
                value: value.to_owned(),
            })
    }

    #[must_use]
    pub fn year(self) -> i32 {
        self.0.year()
    }

    /// Month of the year, `1..=12`.
    #[must_use]
    pub fn month(self) -> u32 {
        self.0.month()
    }

    /// BLS period code of the month (`M01`..`M12`).
    #[must_use]
    pub fn period_code(self) -> String {
        format!("M{:02}", self.month())
    }

    #[must_use]
    pub fn key(self) -> PeriodKey {
        PeriodKey::new(self.year(), &self.period_code())
    }

    /// The following month, or `None` past the end of the calendar.
    #[must_use]
    pub fn next_month(self) -> Option<Self> {
        self.0.checked_add_months(Months::new(1)).map(Self)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

/// Every month from `start` to `end`, both inclusive.
///
/// # Examples
///
/// ```
/// # use kde_cpi_data::period::{Month, month_sequence};
/// let start = Month::parse("2023-11").unwrap();
/// let end = Month::parse("2024-02").unwrap();
/// let months = month_sequence(start, end).unwrap();
/// let labels = months.iter().map(ToString::to_string).collect::<Vec<_>>();
/// assert_eq!(labels, ["2023-11", "2023-12", "2024-01", "2024-02"]);
/// ```
pub fn month_sequence(start: Month, end: Month) -> Result<Vec<Month>, DataError> {
    if start > end {
        return Err(DataError::InvalidMonthRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    let mut months = vec![];
    let mut cursor = Some(start);
    while let Some(month) = cursor.filter(|month| *month <= end) {
        months.push(month);
        cursor = month.next_month();
    }
    Ok(months)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_key_normalization() {
        let key = PeriodKey::new(2024, " m05 ");
        assert_eq!(key.period, "M05");
        assert_eq!(key, PeriodKey::new(2024, "M05"));
    }

    #[test]
    fn test_period_key_ordering() {
        let mut keys = vec![
            PeriodKey::new(2024, "M10"),
            PeriodKey::new(2023, "M13"),
            PeriodKey::new(2024, "M02"),
            PeriodKey::new(2024, "S01"),
            PeriodKey::new(2023, "M12"),
        ];
        keys.sort();
        let labels = keys.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(
            labels,
            ["2023-12", "2023-13", "2024-S01", "2024-02", "2024-10"]
        );
    }

    #[test]
    fn test_previous_year() {
        assert_eq!(
            PeriodKey::new(2024, "M06").previous_year(),
            PeriodKey::new(2023, "M06")
        );
    }

    #[test]
    fn test_month_parse_rejects_garbage() {
        for value in ["2024", "2024-13", "", "2024-06-15", "June 2024"] {
            assert!(
                matches!(Month::parse(value), Err(DataError::InvalidMonth { .. })),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_month_key() {
        let month = Month::parse("2021-01").unwrap();
        assert_eq!(month.key(), PeriodKey::new(2021, "M01"));
    }

    #[test]
    fn test_month_sequence_single_and_reversed() {
        let month = Month::parse("2024-03").unwrap();
        assert_eq!(month_sequence(month, month).unwrap(), [month]);

        let later = Month::parse("2024-04").unwrap();
        assert!(matches!(
            month_sequence(later, month),
            Err(DataError::InvalidMonthRange { .. })
        ));
    }
}
