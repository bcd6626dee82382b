//! Built-in aggregators
//!
//! - `accumulate()`: running sum of every newer sample
//! - `decay(weight)`: exponentially weighted value, `weight` in `(0, 1]`
//! - `window(size)`: the `size` most recent samples
//!
//! All three share the same freshness rule: an incoming sample is merged
//! only if its timestamp is strictly newer than the newest merged timestamp.
//! Stale samples are dropped, leaving the existing state in place.
//!
//! # Example
//!
//! ```rust
//! use kuba_stats::aggregation::{Aggregator, StatState, WindowAggregator};
//! use kuba_stats::tuple::Tuple;
//!
//! let existing = StatState::new(Tuple::decode("1,2").unwrap(), Tuple::decode("10,20").unwrap());
//! let incoming = StatState::new(Tuple::decode("3").unwrap(), Tuple::decode("30").unwrap());
//!
//! let merged = WindowAggregator
//!     .merge(&existing, &incoming, &["2".to_string()])
//!     .unwrap();
//! assert_eq!(merged.values.encode(), "2,3");
//! assert_eq!(merged.timestamps.encode(), "20,30");
//! ```

use std::cmp::Ordering;

use crate::error::AggregationError;
use crate::tuple::{format_scalar, Tuple};

use super::registry::{Aggregator, StatState};

/// One (timestamp, value) observation
#[derive(Debug, Clone, Copy)]
struct Sample<'a> {
    timestamp: Timestamp,
    value: f64,
    raw_timestamp: &'a str,
    raw_value: &'a str,
}

/// Sample time as reported
///
/// Integer text (epoch nanoseconds and the like) is compared exactly; only
/// fractional or exponent forms fall back to `f64`.
#[derive(Debug, Clone, Copy)]
enum Timestamp {
    Integral(i64),
    Fractional(f64),
}

impl Timestamp {
    fn parse(raw: &str) -> Result<Self, AggregationError> {
        match raw.parse::<i64>() {
            Ok(t) => Ok(Timestamp::Integral(t)),
            Err(_) => parse_number(raw).map(Timestamp::Fractional),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Timestamp::Integral(t) => t as f64,
            Timestamp::Fractional(t) => t,
        }
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Timestamp::Integral(a), Timestamp::Integral(b)) => Some(a.cmp(b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

/// Zip a state's tuples into samples, oldest first
fn samples(state: &StatState) -> Result<Vec<Sample<'_>>, AggregationError> {
    let values = state.values.elements();
    let timestamps = state.timestamps.elements();
    if values.len() != timestamps.len() {
        return Err(AggregationError::LengthMismatch {
            values: values.len(),
            timestamps: timestamps.len(),
        });
    }

    values
        .iter()
        .zip(timestamps)
        .map(|(v, t)| {
            Ok(Sample {
                timestamp: Timestamp::parse(t)?,
                value: parse_number(v)?,
                raw_timestamp: t,
                raw_value: v,
            })
        })
        .collect()
}

/// Samples of the existing state; a sentinel contributes none
fn prior_samples(existing: &StatState) -> Result<Vec<Sample<'_>>, AggregationError> {
    if existing.has_data() {
        samples(existing)
    } else {
        Ok(Vec::new())
    }
}

fn parse_number(raw: &str) -> Result<f64, AggregationError> {
    raw.parse::<f64>()
        .map_err(|_| AggregationError::NonNumeric(raw.to_string()))
}

/// Incoming samples strictly newer than `last`, and than each other
fn fresh_samples<'a>(last: Option<Timestamp>, incoming: &[Sample<'a>]) -> Vec<Sample<'a>> {
    let mut newest = last;
    let mut fresh = Vec::with_capacity(incoming.len());
    for sample in incoming {
        if newest.map_or(true, |t| sample.timestamp > t) {
            newest = Some(sample.timestamp);
            fresh.push(*sample);
        }
    }
    fresh
}

/// Extract the single argument of an aggregator
///
/// Accepts the positional form (`5`) or `key=value` with one of `keys`.
fn single_arg<'a>(
    aggregator: &str,
    args: &'a [String],
    keys: &[&str],
) -> Result<&'a str, AggregationError> {
    let invalid = |message: String| AggregationError::InvalidArgument {
        aggregator: aggregator.to_string(),
        message,
    };

    let arg = match args {
        [arg] => arg.as_str(),
        _ => {
            return Err(invalid(format!(
                "expected exactly one argument, got {}",
                args.len()
            )))
        }
    };

    match arg.split_once('=') {
        Some((key, value)) if keys.contains(&key.trim()) => Ok(value.trim()),
        Some((key, _)) => Err(invalid(format!("unknown argument '{}'", key))),
        None => Ok(arg.trim()),
    }
}

/// Running sum aggregator
#[derive(Debug, Clone, Copy, Default)]
pub struct AccumulateAggregator;

impl Aggregator for AccumulateAggregator {
    fn name(&self) -> &'static str {
        "accumulate"
    }

    fn merge(
        &self,
        existing: &StatState,
        incoming: &StatState,
        args: &[String],
    ) -> Result<StatState, AggregationError> {
        if !args.is_empty() {
            return Err(AggregationError::InvalidArgument {
                aggregator: self.name().to_string(),
                message: format!("takes no arguments, got {}", args.len()),
            });
        }

        let (mut total, last) = match prior_samples(existing)?.last() {
            Some(s) => (s.value, Some(s.timestamp)),
            None => (0.0, None),
        };

        let incoming = samples(incoming)?;
        let fresh = fresh_samples(last, &incoming);
        let Some(newest) = fresh.last() else {
            return Ok(existing.clone());
        };

        total += fresh.iter().map(|s| s.value).sum::<f64>();
        if !total.is_finite() {
            return Err(AggregationError::Overflow {
                aggregator: self.name().to_string(),
                value: total,
            });
        }

        Ok(StatState::new(
            Tuple::from_f64s([total]),
            Tuple::from(vec![newest.raw_timestamp.to_string()]),
        ))
    }
}

/// Exponential decay aggregator
///
/// `merged = weight * incoming + (1 - weight) * existing`
#[derive(Debug, Clone, Copy, Default)]
pub struct DecayAggregator;

impl DecayAggregator {
    fn weight(&self, args: &[String]) -> Result<f64, AggregationError> {
        let raw = single_arg(self.name(), args, &["weight", "decay"])?;
        match raw.parse::<f64>() {
            Ok(w) if w > 0.0 && w <= 1.0 => Ok(w),
            _ => Err(AggregationError::InvalidArgument {
                aggregator: self.name().to_string(),
                message: format!("weight '{}' must be in (0, 1]", raw),
            }),
        }
    }
}

impl Aggregator for DecayAggregator {
    fn name(&self) -> &'static str {
        "decay"
    }

    fn merge(
        &self,
        existing: &StatState,
        incoming: &StatState,
        args: &[String],
    ) -> Result<StatState, AggregationError> {
        let weight = self.weight(args)?;

        let (mut current, last) = match prior_samples(existing)?.last() {
            Some(s) => (Some(s.value), Some(s.timestamp)),
            None => (None, None),
        };

        let incoming = samples(incoming)?;
        let fresh = fresh_samples(last, &incoming);
        let Some(newest) = fresh.last() else {
            return Ok(existing.clone());
        };

        for sample in &fresh {
            current = Some(match current {
                Some(c) => weight * sample.value + (1.0 - weight) * c,
                None => sample.value,
            });
        }

        Ok(StatState::new(
            Tuple::from(vec![format_scalar(current.unwrap_or(newest.value))]),
            Tuple::from(vec![newest.raw_timestamp.to_string()]),
        ))
    }
}

/// Bounded sliding window aggregator
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowAggregator;

impl WindowAggregator {
    fn size(&self, args: &[String]) -> Result<usize, AggregationError> {
        let raw = single_arg(self.name(), args, &["size", "window"])?;
        match raw.parse::<usize>() {
            Ok(size) if size > 0 => Ok(size),
            _ => Err(AggregationError::InvalidArgument {
                aggregator: self.name().to_string(),
                message: format!("size '{}' must be a positive integer", raw),
            }),
        }
    }
}

impl Aggregator for WindowAggregator {
    fn name(&self) -> &'static str {
        "window"
    }

    fn merge(
        &self,
        existing: &StatState,
        incoming: &StatState,
        args: &[String],
    ) -> Result<StatState, AggregationError> {
        let size = self.size(args)?;

        let mut merged = if existing.has_data() {
            existing.clone()
        } else {
            StatState::default()
        };
        let last = samples(&merged)?.last().map(|s| s.timestamp);

        let incoming = samples(incoming)?;
        for sample in fresh_samples(last, &incoming) {
            merged.values.push(sample.raw_value);
            merged.timestamps.push(sample.raw_timestamp);
        }

        merged.values.truncate_front(size);
        merged.timestamps.truncate_front(size);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(values: &str, timestamps: &str) -> StatState {
        StatState::new(
            Tuple::decode(values).unwrap(),
            Tuple::decode(timestamps).unwrap(),
        )
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_accumulate_cold_start() {
        let merged = AccumulateAggregator
            .merge(&StatState::default(), &state("5", "100"), &[])
            .unwrap();
        assert_eq!(merged, state("5", "100"));
    }

    #[test]
    fn test_accumulate_sums_newer_samples() {
        let merged = AccumulateAggregator
            .merge(&state("5", "100"), &state("2,3", "101,102"), &[])
            .unwrap();
        assert_eq!(merged, state("10", "102"));
    }

    #[test]
    fn test_accumulate_ignores_stale_samples() {
        let existing = state("5", "100");
        let merged = AccumulateAggregator
            .merge(&existing, &state("7", "100"), &[])
            .unwrap();
        assert_eq!(merged, existing);
    }

    #[test]
    fn test_accumulate_overflow_is_rejected() {
        let err = AccumulateAggregator
            .merge(&state("1e308", "1"), &state("1e308", "2"), &[])
            .unwrap_err();
        assert!(matches!(err, AggregationError::Overflow { .. }));
    }

    #[test]
    fn test_accumulate_rejects_arguments() {
        let err = AccumulateAggregator
            .merge(&StatState::default(), &state("1", "1"), &args(&["5"]))
            .unwrap_err();
        assert!(matches!(err, AggregationError::InvalidArgument { .. }));
    }

    #[test]
    fn test_decay_blends_values() {
        let merged = DecayAggregator
            .merge(&state("10", "1"), &state("20", "2"), &args(&["0.5"]))
            .unwrap();
        assert_eq!(merged, state("15", "2"));

        let named = DecayAggregator
            .merge(&state("10", "1"), &state("20", "2"), &args(&["weight=0.25"]))
            .unwrap();
        assert_eq!(named.values.encode(), "12.5");
    }

    #[test]
    fn test_decay_cold_start_takes_incoming() {
        let merged = DecayAggregator
            .merge(&StatState::default(), &state("4", "9"), &args(&["0.1"]))
            .unwrap();
        assert_eq!(merged, state("4", "9"));
    }

    #[test]
    fn test_decay_weight_validation() {
        for bad in ["0", "1.5", "x", "alpha=0.5"] {
            let err = DecayAggregator
                .merge(&StatState::default(), &state("1", "1"), &args(&[bad]))
                .unwrap_err();
            assert!(matches!(err, AggregationError::InvalidArgument { .. }), "{}", bad);
        }
    }

    #[test]
    fn test_window_bounds_length() {
        let merged = WindowAggregator
            .merge(&state("1,2,3", "1,2,3"), &state("4,5", "4,5"), &args(&["size=3"]))
            .unwrap();
        assert_eq!(merged, state("3,4,5", "3,4,5"));
    }

    #[test]
    fn test_window_accepts_window_key() {
        let merged = WindowAggregator
            .merge(&StatState::default(), &state("7", "70"), &args(&["window=60"]))
            .unwrap();
        assert_eq!(merged, state("7", "70"));
    }

    #[test]
    fn test_window_skips_stale() {
        let merged = WindowAggregator
            .merge(&state("1,2", "10,20"), &state("9", "15"), &args(&["4"]))
            .unwrap();
        assert_eq!(merged, state("1,2", "10,20"));
    }

    #[test]
    fn test_window_nanosecond_timestamps() {
        let first = WindowAggregator
            .merge(&StatState::default(), &state("1", "1700000000000000001"), &args(&["5"]))
            .unwrap();
        let merged = WindowAggregator
            .merge(&first, &state("2", "1700000000000000100"), &args(&["5"]))
            .unwrap();
        assert_eq!(merged, state("1,2", "1700000000000000001,1700000000000000100"));

        let stale = WindowAggregator
            .merge(&merged, &state("3", "1700000000000000099"), &args(&["5"]))
            .unwrap();
        assert_eq!(stale, merged);
    }

    #[test]
    fn test_mixed_timestamp_forms() {
        let merged = AccumulateAggregator
            .merge(&state("1", "10"), &state("2", "10.5"), &[])
            .unwrap();
        assert_eq!(merged, state("3", "10.5"));
    }

    #[test]
    fn test_length_mismatch() {
        let err = WindowAggregator
            .merge(&StatState::default(), &state("1,2", "1"), &args(&["4"]))
            .unwrap_err();
        assert!(matches!(err, AggregationError::LengthMismatch { .. }));
    }

    #[test]
    fn test_both_sentinels_stay_empty() {
        let merged = WindowAggregator
            .merge(&StatState::default(), &StatState::default(), &args(&["4"]))
            .unwrap();
        assert!(!merged.has_data());
    }
}
