//! Conversion of Akenza time series into Grafana frames.
use akenza_client::TimeSeriesPoint;
use chrono::{DateTime, Utc};
use grafana_plugin_sdk::{data, prelude::*};
use thiserror::Error;

/// Errors assembling a series.
#[derive(Debug, Error)]
pub enum SeriesError {
    /// A sample's timestamp was not valid RFC 3339.
    #[error("invalid timestamp {timestamp:?} at index {index}: {source}")]
    InvalidTimestamp {
        /// Position of the sample in the response.
        index: usize,
        /// The offending timestamp.
        timestamp: String,
        /// The parse error.
        source: chrono::ParseError,
    },
    /// The epoch-millisecond value is out of range for a timestamp.
    #[error("timestamp {0} ms is out of range")]
    OutOfRange(i64),
}

/// A column-oriented series: parallel time and value columns of equal length.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeries {
    /// Display name of the series.
    pub name: String,
    /// Sample times in epoch milliseconds.
    pub time_ms: Vec<i64>,
    /// Sample values.
    pub values: Vec<f64>,
}

/// Build a [`TimeSeries`] from samples.
///
/// Every sample becomes exactly one row, in input order. There is no
/// resampling or gap filling.
pub fn assemble(points: &[TimeSeriesPoint], series_name: &str) -> Result<TimeSeries, SeriesError> {
    let mut time_ms = Vec::with_capacity(points.len());
    let mut values = Vec::with_capacity(points.len());
    for (index, point) in points.iter().enumerate() {
        let timestamp = DateTime::parse_from_rfc3339(point.timestamp()).map_err(|source| {
            SeriesError::InvalidTimestamp {
                index,
                timestamp: point.timestamp().to_string(),
                source,
            }
        })?;
        time_ms.push(timestamp.timestamp_millis());
        values.push(point.value());
    }
    Ok(TimeSeries {
        name: series_name.to_string(),
        time_ms,
        values,
    })
}

/// The display name of a series: `"<device name> - <data key>"`.
pub fn series_name(device_name: &str, data_key: &str) -> String {
    format!("{device_name} - {data_key}")
}

impl TimeSeries {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Convert into a Grafana frame with a `Time` field and a value field named after the series.
    pub fn to_frame(&self) -> Result<data::Frame, SeriesError> {
        let times = self
            .time_ms
            .iter()
            .map(|ms| DateTime::<Utc>::from_timestamp_millis(*ms).ok_or(SeriesError::OutOfRange(*ms)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(data::Frame::new(self.name.as_str())
            .with_field(times.into_field("Time"))
            .with_field(self.values.iter().copied().into_field(self.name.as_str())))
    }
}
