//! Five-field cron expressions, evaluated in UTC.
//!
//! ```text
//! ┌───────── minute        0-59
//! │ ┌─────── hour          0-23
//! │ │ ┌───── day of month  1-31
//! │ │ │ ┌─── month         1-12 or JAN-DEC
//! │ │ │ │ ┌─ day of week   0-7 or SUN-SAT (0 and 7 are Sunday)
//! * * * * *
//! ```
//!
//! Fields accept `*`, values, ranges `a-b`, lists `a,b` and steps `*/n`,
//! `a-b/n`, `a/n`. When both day fields are restricted a day matches if
//! either matches, as in Vixie cron. `@hourly`, `@daily`, `@weekly`,
//! `@monthly` and `@yearly` are shorthands.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use thiserror::Error;

/// How far ahead `next_after` searches before deciding a schedule never fires.
const SEARCH_YEARS: i64 = 5;

const MONTH_NAMES: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const DOW_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CronError {
    #[error("expected 5 fields, got {0}")]
    FieldCount(usize),

    #[error("invalid {field} field '{value}': {reason}")]
    Field {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Allowed values of one field as a bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldSet {
    bits: u64,
    /// The field was written starting with `*`
    wildcard: bool,
}

impl FieldSet {
    fn contains(&self, v: u32) -> bool {
        self.bits & (1u64 << v) != 0
    }
}

struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [&'static str],
    /// Offset added to a name's index (months are 1-based)
    name_base: u32,
}

const MINUTE: FieldSpec = FieldSpec {
    name: "minute",
    min: 0,
    max: 59,
    names: &[],
    name_base: 0,
};
const HOUR: FieldSpec = FieldSpec {
    name: "hour",
    min: 0,
    max: 23,
    names: &[],
    name_base: 0,
};
const DAY_OF_MONTH: FieldSpec = FieldSpec {
    name: "day-of-month",
    min: 1,
    max: 31,
    names: &[],
    name_base: 0,
};
const MONTH: FieldSpec = FieldSpec {
    name: "month",
    min: 1,
    max: 12,
    names: &MONTH_NAMES,
    name_base: 1,
};
const DAY_OF_WEEK: FieldSpec = FieldSpec {
    name: "day-of-week",
    min: 0,
    max: 7,
    names: &DOW_NAMES,
    name_base: 0,
};

impl FieldSpec {
    fn error(&self, value: &str, reason: impl Into<String>) -> CronError {
        CronError::Field {
            field: self.name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    fn value(&self, s: &str, whole: &str) -> Result<u32, CronError> {
        let upper = s.to_ascii_uppercase();
        let v = match self.names.iter().position(|n| *n == upper) {
            Some(i) => i as u32 + self.name_base,
            None => s
                .parse::<u32>()
                .map_err(|_| self.error(whole, format!("'{}' is not a number", s)))?,
        };
        if v < self.min || v > self.max {
            return Err(self.error(
                whole,
                format!("{} is outside {}-{}", v, self.min, self.max),
            ));
        }
        Ok(v)
    }

    fn parse(&self, field: &str) -> Result<FieldSet, CronError> {
        let mut bits = 0u64;

        for part in field.split(',') {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => {
                    let step: u32 = step
                        .parse()
                        .map_err(|_| self.error(field, format!("bad step '{}'", step)))?;
                    if step == 0 {
                        return Err(self.error(field, "step must be positive"));
                    }
                    (range, Some(step))
                }
                None => (part, None),
            };

            let (lo, hi) = if range == "*" {
                (self.min, self.max)
            } else if let Some((a, b)) = range.split_once('-') {
                (self.value(a, field)?, self.value(b, field)?)
            } else {
                let v = self.value(range, field)?;
                // `a/n` means from a to the end of the field
                (v, if step.is_some() { self.max } else { v })
            };

            if lo > hi {
                return Err(self.error(field, format!("range {}-{} is reversed", lo, hi)));
            }

            let step = step.unwrap_or(1) as usize;
            for v in (lo..=hi).step_by(step) {
                bits |= 1u64 << v;
            }
        }

        Ok(FieldSet {
            bits,
            wildcard: field.starts_with('*'),
        })
    }
}

/// A parsed cron schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expr: String,
    minute: FieldSet,
    hour: FieldSet,
    day_of_month: FieldSet,
    month: FieldSet,
    day_of_week: FieldSet,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let expr = expr.trim();
        let expanded = match expr.to_ascii_lowercase().as_str() {
            "@yearly" | "@annually" => "0 0 1 1 *",
            "@monthly" => "0 0 1 * *",
            "@weekly" => "0 0 * * 0",
            "@daily" | "@midnight" => "0 0 * * *",
            "@hourly" => "0 * * * *",
            _ => expr,
        };

        let fields: Vec<&str> = expanded.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronError::FieldCount(fields.len()));
        }

        let mut day_of_week = DAY_OF_WEEK.parse(fields[4])?;
        // 7 is another name for Sunday
        if day_of_week.contains(7) {
            day_of_week.bits = (day_of_week.bits | 1) & !(1u64 << 7);
        }

        Ok(Self {
            expr: expr.to_string(),
            minute: MINUTE.parse(fields[0])?,
            hour: HOUR.parse(fields[1])?,
            day_of_month: DAY_OF_MONTH.parse(fields[2])?,
            month: MONTH.parse(fields[3])?,
            day_of_week,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        let dom = self.day_of_month.contains(date.day());
        let dow = self
            .day_of_week
            .contains(date.weekday().num_days_from_sunday());

        if self.day_of_month.wildcard || self.day_of_week.wildcard {
            dom && dow
        } else {
            dom || dow
        }
    }

    /// First fire time strictly after `after`, at minute resolution.
    ///
    /// `None` if the schedule never fires, e.g. `0 0 30 2 *`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after.naive_utc().with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
        let limit = start + Duration::days(366 * SEARCH_YEARS);
        let mut t = start;

        while t <= limit {
            if !self.month.contains(t.month()) {
                t = first_of_next_month(t.date())?;
                continue;
            }
            if !self.day_matches(t.date()) {
                t = midnight(t.date().succ_opt()?)?;
                continue;
            }
            if !self.hour.contains(t.hour()) {
                t = t.with_minute(0)? + Duration::hours(1);
                continue;
            }
            if !self.minute.contains(t.minute()) {
                t += Duration::minutes(1);
                continue;
            }
            return Some(Utc.from_utc_datetime(&t));
        }

        None
    }
}

impl FromStr for CronSchedule {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

fn midnight(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDateTime> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    midnight(NaiveDate::from_ymd_opt(year, month, 1)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        Utc.from_utc_datetime(&NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap())
    }

    fn next(expr: &str, after: &str) -> DateTime<Utc> {
        CronSchedule::parse(expr).unwrap().next_after(utc(after)).unwrap()
    }

    #[test]
    fn test_daily_at_two() {
        assert_eq!(next("0 2 * * *", "2025-01-01 01:59:30"), utc("2025-01-01 02:00:00"));
        // strictly after
        assert_eq!(next("0 2 * * *", "2025-01-01 02:00:00"), utc("2025-01-02 02:00:00"));
        assert_eq!(next("0 2 * * *", "2025-12-31 03:00:00"), utc("2026-01-01 02:00:00"));
    }

    #[test]
    fn test_steps_and_ranges() {
        assert_eq!(next("*/15 * * * *", "2025-01-01 10:07:00"), utc("2025-01-01 10:15:00"));
        assert_eq!(next("*/15 * * * *", "2025-01-01 10:45:10"), utc("2025-01-01 11:00:00"));
        // 09:30, 13:30, 17:30 on weekdays; 2025-01-03 is a Friday
        assert_eq!(next("30 9-17/4 * * 1-5", "2025-01-03 17:31:00"), utc("2025-01-06 09:30:00"));
        assert_eq!(next("30 9-17/4 * * 1-5", "2025-01-06 10:00:00"), utc("2025-01-06 13:30:00"));
        assert_eq!(next("5/20 * * * *", "2025-01-01 00:26:00"), utc("2025-01-01 00:45:00"));
    }

    #[test]
    fn test_lists_and_names() {
        assert_eq!(next("0 6,18 * * *", "2025-01-01 07:00:00"), utc("2025-01-01 18:00:00"));
        assert_eq!(next("0 0 1 jan,jul *", "2025-02-01 00:00:00"), utc("2025-07-01 00:00:00"));
        // 2025-01-01 is a Wednesday
        assert_eq!(next("0 12 * * MON", "2025-01-01 00:00:00"), utc("2025-01-06 12:00:00"));
    }

    #[test]
    fn test_sunday_is_zero_and_seven() {
        // 2025-01-05 is a Sunday
        assert_eq!(next("0 0 * * 0", "2025-01-01 00:00:00"), utc("2025-01-05 00:00:00"));
        assert_eq!(next("0 0 * * 7", "2025-01-01 00:00:00"), utc("2025-01-05 00:00:00"));
    }

    #[test]
    fn test_day_of_month_or_day_of_week() {
        // the 13th or any Friday; 2025-01-03 is a Friday
        assert_eq!(next("0 0 13 * 5", "2025-01-01 00:00:00"), utc("2025-01-03 00:00:00"));
        assert_eq!(next("0 0 13 * 5", "2025-01-10 00:00:00"), utc("2025-01-13 00:00:00"));
        // a wildcard day-of-week restricts nothing
        assert_eq!(next("0 0 13 * *", "2025-01-01 00:00:00"), utc("2025-01-13 00:00:00"));
    }

    #[test]
    fn test_month_rollover() {
        assert_eq!(next("0 0 31 * *", "2025-01-31 00:00:00"), utc("2025-03-31 00:00:00"));
        assert_eq!(next("0 0 29 2 *", "2025-01-01 00:00:00"), utc("2028-02-29 00:00:00"));
    }

    #[test]
    fn test_never_fires() {
        let schedule = CronSchedule::parse("0 0 30 2 *").unwrap();
        assert!(schedule.next_after(utc("2025-01-01 00:00:00")).is_none());
    }

    #[test]
    fn test_shorthands() {
        assert_eq!(next("@daily", "2025-01-01 12:00:00"), utc("2025-01-02 00:00:00"));
        assert_eq!(next("@hourly", "2025-01-01 12:00:00"), utc("2025-01-01 13:00:00"));
        assert_eq!(CronSchedule::parse("@daily").unwrap().as_str(), "@daily");
    }

    #[test]
    fn test_invalid() {
        assert_eq!(CronSchedule::parse("* * *"), Err(CronError::FieldCount(3)));
        for expr in [
            "60 * * * *",
            "* 24 * * *",
            "* * 0 * *",
            "* * * 13 *",
            "* * * * 8",
            "5-1 * * * *",
            "*/0 * * * *",
            "x * * * *",
        ] {
            assert!(CronSchedule::parse(expr).is_err(), "{} should be rejected", expr);
        }
    }
}
