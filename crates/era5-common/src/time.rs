//! Date ranges and DHIS2 period identifiers.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

/// Parse a `YYYY-MM-DD` date.
pub fn parse_iso_date(s: &str) -> CommonResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| CommonError::InvalidDate(s.to_string()))
}

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CommonResult<Self> {
        if start > end {
            return Err(CommonError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Create a range, or `None` when it would be empty.
    pub fn non_empty(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Number of days in the range.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Iterate over every day in the range.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.num_days()).map(move |offset| start + Duration::days(offset))
    }

    /// Split at calendar-month boundaries.
    pub fn monthly_chunks(&self) -> Vec<DateRange> {
        let mut chunks = Vec::new();
        let mut cursor = self.start;
        while cursor <= self.end {
            let month_end = last_day_of_month(cursor.year(), cursor.month());
            let chunk_end = month_end.min(self.end);
            chunks.push(DateRange {
                start: cursor,
                end: chunk_end,
            });
            cursor = chunk_end + Duration::days(1);
        }
        chunks
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Last calendar day of the given month.
pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    // Day 1 of any month between 1 and 12 always exists.
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .map(|d| d - Duration::days(1))
        .unwrap_or(NaiveDate::MAX)
}

/// A DHIS2 period identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    /// `YYYYMMDD`
    Daily(NaiveDate),
    /// `YYYYMM`
    Monthly { year: i32, month: u32 },
}

impl Period {
    pub fn daily(date: NaiveDate) -> Self {
        Period::Daily(date)
    }

    /// The DHIS2 period id.
    pub fn id(&self) -> String {
        match self {
            Period::Daily(date) => date.format("%Y%m%d").to_string(),
            Period::Monthly { year, month } => format!("{:04}{:02}", year, month),
        }
    }

    /// Last calendar day covered by the period.
    pub fn last_day(&self) -> NaiveDate {
        match *self {
            Period::Daily(date) => date,
            Period::Monthly { year, month } => last_day_of_month(year, month),
        }
    }

    /// First day after the period ends.
    pub fn next_day(&self) -> NaiveDate {
        self.last_day() + Duration::days(1)
    }
}

impl FromStr for Period {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(CommonError::InvalidPeriod(s.to_string()));
        }
        match s.len() {
            8 => NaiveDate::parse_from_str(s, "%Y%m%d")
                .map(Period::Daily)
                .map_err(|_| CommonError::InvalidPeriod(s.to_string())),
            6 => {
                let year: i32 = s[..4]
                    .parse()
                    .map_err(|_| CommonError::InvalidPeriod(s.to_string()))?;
                let month: u32 = s[4..]
                    .parse()
                    .map_err(|_| CommonError::InvalidPeriod(s.to_string()))?;
                if !(1..=12).contains(&month) {
                    return Err(CommonError::InvalidPeriod(s.to_string()));
                }
                Ok(Period::Monthly { year, month })
            }
            _ => Err(CommonError::InvalidPeriod(s.to_string())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}
