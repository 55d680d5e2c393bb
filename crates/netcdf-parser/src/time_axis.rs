//! CF-convention time coordinates (`"<unit> since <epoch>"`).

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{NetCdfError, NetCdfResult};

/// Step unit of a CF time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3600.0,
            TimeUnit::Days => 86400.0,
        }
    }
}

/// A parsed CF `units` attribute for a time variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAxis {
    pub unit: TimeUnit,
    pub epoch: NaiveDateTime,
}

impl TimeAxis {
    /// Parse e.g. `"seconds since 1970-01-01"` or `"hours since 1900-01-01 00:00:00.0"`.
    pub fn parse(units: &str) -> NetCdfResult<Self> {
        let invalid = || NetCdfError::InvalidFormat(format!("unsupported time units '{}'", units));

        let (unit, epoch) = units.split_once(" since ").ok_or_else(invalid)?;
        let unit = match unit.trim().to_ascii_lowercase().as_str() {
            "seconds" | "second" | "s" => TimeUnit::Seconds,
            "minutes" | "minute" | "min" => TimeUnit::Minutes,
            "hours" | "hour" | "h" => TimeUnit::Hours,
            "days" | "day" | "d" => TimeUnit::Days,
            _ => return Err(invalid()),
        };

        let epoch = parse_epoch(epoch.trim()).ok_or_else(invalid)?;
        Ok(Self { unit, epoch })
    }

    /// Convert a raw offset to a timestamp, rounded to the nearest second.
    ///
    /// Fill values and offsets outside chrono's range are rejected.
    pub fn to_datetime(&self, offset: f64) -> NetCdfResult<NaiveDateTime> {
        let out_of_range =
            || NetCdfError::InvalidFormat(format!("time offset {} is out of range", offset));

        let secs = (offset * self.unit.seconds()).round();
        // i64::MAX as f64 rounds up, so the bound is exclusive
        if !secs.is_finite() || secs.abs() >= i64::MAX as f64 {
            return Err(out_of_range());
        }
        Duration::try_seconds(secs as i64)
            .and_then(|d| self.epoch.checked_add_signed(d))
            .ok_or_else(out_of_range)
    }
}

fn parse_epoch(s: &str) -> Option<NaiveDateTime> {
    // Drop a trailing "UTC"/"Z" and fractional seconds; ERA5 epochs are whole.
    let s = s.trim_end_matches(" UTC").trim_end_matches('Z');
    let s = s.split('.').next().unwrap_or(s);
    let s = s.replace('T', " ");

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_new_cds_units() {
        let axis = TimeAxis::parse("seconds since 1970-01-01").unwrap();
        assert_eq!(axis.unit, TimeUnit::Seconds);
        assert_eq!(axis.to_datetime(1_735_689_600.0).unwrap(), ts("2025-01-01 00:00:00"));
    }

    #[test]
    fn test_legacy_cds_units() {
        let axis = TimeAxis::parse("hours since 1900-01-01 00:00:00.0").unwrap();
        assert_eq!(axis.unit, TimeUnit::Hours);
        assert_eq!(axis.epoch, ts("1900-01-01 00:00:00"));
        assert_eq!(axis.to_datetime(1_094_616.0).unwrap(), ts("2024-11-15 00:00:00"));
    }

    #[test]
    fn test_unrepresentable_offsets_are_errors() {
        let axis = TimeAxis::parse("hours since 1900-01-01").unwrap();
        for offset in [9.969_209_968_386_869e36, f64::NAN, f64::INFINITY, -1e15, 1e15] {
            assert!(
                matches!(axis.to_datetime(offset), Err(NetCdfError::InvalidFormat(_))),
                "{} should be rejected",
                offset
            );
        }
    }

    #[test]
    fn test_rejects_unknown_units() {
        assert!(TimeAxis::parse("fortnights since 1970-01-01").is_err());
        assert!(TimeAxis::parse("seconds").is_err());
    }
}
