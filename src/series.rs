use std::ops::Index;

use chrono::{DateTime, Utc};

use crate::error::ValueParseError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    // Accepts the Prometheus float grammar, including `NaN`, `Inf`, `+Inf`
    // and `-Inf`, which Rust's float parser already covers.
    pub fn from_wire(ts_seconds: f64, raw_value: &str) -> Result<Self, ValueParseError> {
        let value = raw_value
            .parse::<f64>()
            .map_err(|_| ValueParseError::Value(raw_value.to_string()))?;

        if !ts_seconds.is_finite() {
            return Err(ValueParseError::Timestamp(ts_seconds));
        }
        let secs = ts_seconds.div_euclid(1.0);
        let mut nanos = (ts_seconds.rem_euclid(1.0) * 1e9).round() as u32;
        let mut secs = if secs >= (i64::MIN as f64) && secs <= (i64::MAX as f64) {
            secs as i64
        } else {
            return Err(ValueParseError::Timestamp(ts_seconds));
        };
        if nanos >= 1_000_000_000 {
            secs += 1;
            nanos = 0;
        }
        let timestamp = DateTime::<Utc>::from_timestamp(secs, nanos)
            .ok_or(ValueParseError::Timestamp(ts_seconds))?;

        Ok(Self { timestamp, value })
    }

    pub fn unix_seconds(&self) -> f64 {
        self.timestamp.timestamp() as f64 + f64::from(self.timestamp.timestamp_subsec_nanos()) / 1e9
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries(Vec<TimeSeriesPoint>);

impl TimeSeries {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, point: TimeSeriesPoint) {
        self.0.push(point);
    }

    // Consumes `other`; points already in `self` keep their order.
    pub fn extend(&mut self, other: TimeSeries) {
        self.0.extend(other.0);
    }

    // Ties resolve to the first point carrying the maximum timestamp.
    pub fn latest(&self) -> Option<&TimeSeriesPoint> {
        let mut best: Option<&TimeSeriesPoint> = None;
        for point in &self.0 {
            match best {
                Some(current) if point.timestamp <= current.timestamp => {}
                _ => best = Some(point),
            }
        }
        best
    }

    pub fn average(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.0.iter().map(|p| p.value).sum::<f64>() / self.0.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimeSeriesPoint> {
        self.0.iter()
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.0
    }
}

impl Index<usize> for TimeSeries {
    type Output = TimeSeriesPoint;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl FromIterator<TimeSeriesPoint> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = TimeSeriesPoint>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for TimeSeries {
    type Item = TimeSeriesPoint;
    type IntoIter = std::vec::IntoIter<TimeSeriesPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a TimeSeriesPoint;
    type IntoIter = std::slice::Iter<'a, TimeSeriesPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
