use std::collections::{BTreeMap, HashSet};

use chrono_tz::Tz;

use crate::errors::NormalizeError;
use crate::formats::{parse_optional_f64, parse_timestamp};
use crate::model::{
    format_utc, NormalizedTable, RawTable, Sample, SeriesSummary, TableSummary, TimeSeries,
};

pub const DEFAULT_TIMESTAMP_COLUMN: &str = "timestamp";

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub timestamp_column: String,
    pub site: Option<String>,
    /// Zone used for timestamps that carry no offset.
    pub source_timezone: Tz,
    /// Restricts output to these columns; `None` takes every non-timestamp column.
    pub parameters: Option<Vec<String>>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
            site: None,
            source_timezone: chrono_tz::UTC,
            parameters: None,
        }
    }
}

impl NormalizeOptions {
    pub fn with_timestamp_column(mut self, column: impl Into<String>) -> Self {
        self.timestamp_column = column.into();
        self
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.source_timezone = tz;
        self
    }

    pub fn with_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters = Some(parameters.into_iter().map(Into::into).collect());
        self
    }
}

pub fn normalize_csv(
    content: &str,
    options: &NormalizeOptions,
) -> Result<NormalizedTable, NormalizeError> {
    let table = RawTable::from_csv(content)?;
    normalize(&table, options)
}

/// Splits a raw table into one ascending series per parameter column.
///
/// Blank cells are dropped from their parameter's series. The first
/// unparseable cell aborts the whole table.
pub fn normalize(
    table: &RawTable,
    options: &NormalizeOptions,
) -> Result<NormalizedTable, NormalizeError> {
    let mut seen = HashSet::new();
    for header in table.headers.iter().filter(|h| !h.trim().is_empty()) {
        if !seen.insert(header.as_str()) {
            return Err(NormalizeError::DuplicateColumn {
                column: header.clone(),
            });
        }
    }

    let ts_column = options.timestamp_column.as_str();
    let ts_idx = table
        .column_index(ts_column)
        .ok_or_else(|| NormalizeError::MissingColumn {
            column: ts_column.to_string(),
        })?;

    let parameter_columns = resolve_parameter_columns(table, ts_idx, options)?;

    let mut samples: Vec<Vec<Sample>> = parameter_columns
        .iter()
        .map(|_| Vec::with_capacity(table.rows.len()))
        .collect();
    let mut time_range = None;

    for row in &table.rows {
        let timestamp = parse_timestamp(
            ts_column,
            &row.fields[ts_idx],
            row.line_index,
            options.source_timezone,
        )?;

        time_range = Some(match time_range {
            None => (timestamp, timestamp),
            Some((start, end)) => (timestamp.min(start), timestamp.max(end)),
        });

        for (slot, (name, idx)) in parameter_columns.iter().enumerate() {
            if let Some(value) = parse_optional_f64(name, &row.fields[*idx], row.line_index)? {
                samples[slot].push(Sample::new(timestamp, value).with_row(row.line_index));
            }
        }
    }

    let series = parameter_columns
        .into_iter()
        .zip(samples)
        .map(|((name, _), samples)| {
            let series = TimeSeries::new(options.site.clone(), name.clone(), samples);
            (name, series)
        })
        .collect::<BTreeMap<_, _>>();

    Ok(NormalizedTable {
        timestamp_column: ts_column.to_string(),
        row_count: table.rows.len(),
        source_hash: table.source_hash.clone(),
        time_range,
        series,
    })
}

fn resolve_parameter_columns(
    table: &RawTable,
    ts_idx: usize,
    options: &NormalizeOptions,
) -> Result<Vec<(String, usize)>, NormalizeError> {
    match &options.parameters {
        Some(requested) => requested
            .iter()
            .filter(|name| name.as_str() != options.timestamp_column)
            .map(|name| {
                table
                    .column_index(name)
                    .map(|idx| (name.clone(), idx))
                    .ok_or_else(|| NormalizeError::MissingColumn {
                        column: name.clone(),
                    })
            })
            .collect(),
        None => Ok(table
            .headers
            .iter()
            .enumerate()
            .filter(|(idx, name)| *idx != ts_idx && !name.trim().is_empty())
            .map(|(idx, name)| (name.clone(), idx))
            .collect()),
    }
}

/// Per-parameter count/min/max/mean plus the overall time range.
pub fn summarize(table: &NormalizedTable) -> TableSummary {
    let parameters = table
        .series
        .iter()
        .map(|(name, series)| (name.clone(), SeriesSummary::of(series)))
        .collect();

    TableSummary {
        row_count: table.row_count,
        records_imported: table.sample_count(),
        parameters,
        time_range: table
            .time_range
            .map(|(start, end)| [format_utc(start), format_utc(end)]),
    }
}
