//! Core types for grid processing.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::GridProcessorError;

/// How values are combined, over time steps or over zone cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
    Min,
    Max,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
        }
    }

    /// Reduce the finite values of `values`, ignoring NaN.
    ///
    /// Returns `None` when there are no finite values.
    pub fn reduce<I>(&self, values: I) -> Option<f64>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut acc = Accumulator::new(*self);
        for v in values {
            acc.push(v);
        }
        acc.finish()
    }
}

impl FromStr for Aggregation {
    type Err = GridProcessorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregation::Sum),
            "mean" | "avg" | "average" => Ok(Aggregation::Mean),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            _ => Err(GridProcessorError::UnknownAggregation(s.to_string())),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running reduction over a stream of values, NaN skipped.
///
/// Sums are kept in f64 so long hourly series don't lose precision.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Accumulator {
    how: Aggregation,
    acc: f64,
    count: usize,
}

impl Accumulator {
    pub(crate) fn new(how: Aggregation) -> Self {
        let acc = match how {
            Aggregation::Sum | Aggregation::Mean => 0.0,
            Aggregation::Min => f64::INFINITY,
            Aggregation::Max => f64::NEG_INFINITY,
        };
        Self { how, acc, count: 0 }
    }

    pub(crate) fn push(&mut self, v: f32) {
        if !v.is_finite() {
            return;
        }
        let v = v as f64;
        self.acc = match self.how {
            Aggregation::Sum | Aggregation::Mean => self.acc + v,
            Aggregation::Min => self.acc.min(v),
            Aggregation::Max => self.acc.max(v),
        };
        self.count += 1;
    }

    pub(crate) fn finish(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(match self.how {
            Aggregation::Mean => self.acc / self.count as f64,
            _ => self.acc,
        })
    }
}

/// One aggregated value for a zone on a day.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalValue {
    pub zone_id: String,
    pub date: NaiveDate,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aggregation() {
        assert_eq!("sum".parse::<Aggregation>().unwrap(), Aggregation::Sum);
        assert_eq!(" MEAN ".parse::<Aggregation>().unwrap(), Aggregation::Mean);
        assert_eq!("max".parse::<Aggregation>().unwrap(), Aggregation::Max);
        assert!("median".parse::<Aggregation>().is_err());
    }

    #[test]
    fn test_reduce_ignores_nan() {
        let values = [1.0f32, f32::NAN, 3.0];
        assert_eq!(Aggregation::Sum.reduce(values), Some(4.0));
        assert_eq!(Aggregation::Mean.reduce(values), Some(2.0));
        assert_eq!(Aggregation::Min.reduce(values), Some(1.0));
        assert_eq!(Aggregation::Max.reduce(values), Some(3.0));
    }

    #[test]
    fn test_reduce_all_nan_is_none() {
        assert_eq!(Aggregation::Sum.reduce([f32::NAN, f32::NAN]), None);
        assert_eq!(Aggregation::Max.reduce(Vec::<f32>::new()), None);
    }
}
