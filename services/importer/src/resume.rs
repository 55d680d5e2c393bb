//! Where an import picks up from.
//!
//! DHIS2 is the only record of what has been imported. Each run asks it for
//! the latest stored period and skips everything up to and including it.

use era5_common::{DateRange, Period};

/// The part of `configured` that comes after `latest`.
///
/// A daily period resumes on the following day and a monthly period on the
/// first day of the next month. `None` when nothing is left.
pub fn remaining_range(configured: &DateRange, latest: Option<Period>) -> Option<DateRange> {
    let start = match latest {
        Some(period) => configured.start.max(period.next_day()),
        None => configured.start,
    };
    DateRange::non_empty(start, configured.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange::new(start, end).unwrap()
    }

    #[test]
    fn test_nothing_imported_yet() {
        let configured = range(d(2025, 1, 1), d(2025, 3, 31));
        assert_eq!(remaining_range(&configured, None), Some(configured));
    }

    #[test]
    fn test_resume_after_daily_period() {
        let configured = range(d(2025, 1, 1), d(2025, 3, 31));
        let latest = Period::daily(d(2025, 2, 14));
        assert_eq!(
            remaining_range(&configured, Some(latest)),
            Some(range(d(2025, 2, 15), d(2025, 3, 31)))
        );
    }

    #[test]
    fn test_resume_after_monthly_period() {
        let configured = range(d(2025, 1, 1), d(2025, 3, 31));
        let latest: Period = "202501".parse().unwrap();
        assert_eq!(
            remaining_range(&configured, Some(latest)),
            Some(range(d(2025, 2, 1), d(2025, 3, 31)))
        );
    }

    #[test]
    fn test_latest_before_configured_start() {
        let configured = range(d(2025, 1, 1), d(2025, 3, 31));
        let latest = Period::daily(d(2024, 12, 31));
        assert_eq!(remaining_range(&configured, Some(latest)), Some(configured));
    }

    #[test]
    fn test_fully_imported() {
        let configured = range(d(2025, 1, 1), d(2025, 3, 31));
        assert_eq!(remaining_range(&configured, Some(Period::daily(d(2025, 3, 31)))), None);
        assert_eq!(remaining_range(&configured, Some(Period::daily(d(2025, 6, 1)))), None);
    }

    #[test]
    fn test_remaining_never_contains_imported_days() {
        let configured = range(d(2024, 12, 20), d(2025, 2, 10));
        let mut latest = d(2024, 12, 1);
        while latest <= d(2025, 3, 1) {
            for period in [
                Period::daily(latest),
                Period::Monthly {
                    year: chrono::Datelike::year(&latest),
                    month: chrono::Datelike::month(&latest),
                },
            ] {
                if let Some(remaining) = remaining_range(&configured, Some(period)) {
                    assert!(remaining.start > period.last_day());
                    assert!(remaining.start >= configured.start);
                    assert_eq!(remaining.end, configured.end);
                } else {
                    assert!(period.last_day() >= configured.end);
                }
            }
            latest += Duration::days(1);
        }
    }
}
