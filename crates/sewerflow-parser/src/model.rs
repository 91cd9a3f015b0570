use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::NormalizeError;

/// Raw tabular input as handed over by a collaborator: a header plus rows of
/// untyped cells.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub source_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RawRow {
    pub line_index: usize,
    pub fields: Vec<String>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, NormalizeError> {
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(NormalizeError::EmptyHeader);
        }

        let mut raw_rows = Vec::with_capacity(rows.len());
        for (idx, fields) in rows.into_iter().enumerate() {
            let line_index = idx + 2;
            if fields.len() != headers.len() {
                return Err(NormalizeError::RowWidth {
                    line_index,
                    expected: headers.len(),
                    found: fields.len(),
                });
            }
            raw_rows.push(RawRow { line_index, fields });
        }

        Ok(Self {
            headers,
            rows: raw_rows,
            source_hash: None,
        })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Input line the reading came from, when it was read from a table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value,
            row: None,
        }
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}

/// Samples for one (site, parameter) pair, ascending by timestamp. Duplicate
/// timestamps are kept in their input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub site: Option<String>,
    pub parameter: String,
    samples: Vec<Sample>,
}

impl TimeSeries {
    pub fn new(site: Option<String>, parameter: impl Into<String>, mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|sample| sample.timestamp);
        Self {
            site,
            parameter: parameter.into(),
            samples,
        }
    }

    pub fn from_pairs(
        parameter: impl Into<String>,
        pairs: impl IntoIterator<Item = (DateTime<Utc>, f64)>,
    ) -> Self {
        let samples = pairs
            .into_iter()
            .map(|(timestamp, value)| Sample::new(timestamp, value))
            .collect();
        Self::new(None, parameter, samples)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let timestamps = utc_timestamp_series("timestamp", &self.timestamps())?;
        let values = Series::new("value".into(), self.values());
        DataFrame::new(vec![timestamps.into(), values.into()])
    }
}

/// Builds a UTC microsecond datetime column.
pub fn utc_timestamp_series(name: &str, timestamps: &[DateTime<Utc>]) -> PolarsResult<Series> {
    Series::new(
        name.into(),
        timestamps
            .iter()
            .map(|dt| dt.timestamp_micros())
            .collect::<Vec<_>>(),
    )
    .cast(&DataType::Datetime(
        TimeUnit::Microseconds,
        Some(polars::prelude::TimeZone::UTC),
    ))
}

pub fn format_utc(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Normalizer output: one validated series per parameter column.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub timestamp_column: String,
    pub row_count: usize,
    pub source_hash: Option<String>,
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub series: BTreeMap<String, TimeSeries>,
}

impl NormalizedTable {
    pub fn get(&self, parameter: &str) -> Option<&TimeSeries> {
        self.series.get(parameter)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeSeries> {
        self.series.values()
    }

    pub fn sample_count(&self) -> usize {
        self.series.values().map(TimeSeries::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl SeriesSummary {
    pub fn of(series: &TimeSeries) -> Self {
        if series.is_empty() {
            return Self {
                count: 0,
                min: None,
                max: None,
                mean: None,
            };
        }

        let values = series.values();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;

        Self {
            count: values.len(),
            min: Some(min),
            max: Some(max),
            mean: Some(mean),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub row_count: usize,
    /// Present readings across all parameters.
    pub records_imported: usize,
    pub parameters: BTreeMap<String, SeriesSummary>,
    pub time_range: Option<[String; 2]>,
}
