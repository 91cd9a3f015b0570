use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::*;
use sewerflow_parser::utc_timestamp_series;

use crate::error::Result;
use crate::gaps::GapReport;
use crate::hydraulics::HydraulicSample;
use crate::pipeline::ProcessingOutput;

/// One row per sample with its flag and the full condition set.
pub fn qc_frame(output: &ProcessingOutput) -> PolarsResult<DataFrame> {
    let mut sites: Vec<Option<String>> = Vec::new();
    let mut timestamps: Vec<DateTime<Utc>> = Vec::new();
    let mut parameters: Vec<String> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    let mut flags: Vec<&'static str> = Vec::new();
    let mut conditions: Vec<String> = Vec::new();

    for (parameter, series_output) in &output.series {
        let qc = &series_output.qc;
        for ((sample, flag), condition) in qc
            .series
            .samples()
            .iter()
            .zip(&qc.flags)
            .zip(&qc.conditions)
        {
            sites.push(qc.series.site.clone().or_else(|| output.site.clone()));
            timestamps.push(sample.timestamp);
            parameters.push(parameter.clone());
            values.push(sample.value);
            flags.push(flag.as_str());
            conditions.push(condition.to_string());
        }
    }

    let columns: Vec<Column> = vec![
        Series::new("site".into(), sites).into(),
        utc_timestamp_series("timestamp", &timestamps)?.into(),
        Series::new("parameter".into(), parameters).into(),
        Series::new("value".into(), values).into(),
        Series::new("qc_flag".into(), flags).into(),
        Series::new("qc_conditions".into(), conditions).into(),
    ];
    DataFrame::new(columns)
}

pub fn hydraulic_frame(samples: &[HydraulicSample]) -> PolarsResult<DataFrame> {
    let timestamps: Vec<DateTime<Utc>> = samples.iter().map(|s| s.timestamp).collect();

    let columns: Vec<Column> = vec![
        utc_timestamp_series("timestamp", &timestamps)?.into(),
        Series::new(
            "depth_mm".into(),
            samples.iter().map(|s| s.depth_mm).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "area_m2".into(),
            samples.iter().map(|s| s.area_m2).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "flow_m3_s".into(),
            samples.iter().map(|s| s.flow_m3_s).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "velocity_m_s".into(),
            samples.iter().map(|s| s.velocity_m_s).collect::<Vec<_>>(),
        )
        .into(),
    ];
    DataFrame::new(columns)
}

pub fn parquet_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let mut clone = df.clone();
        ParquetWriter::new(&mut cursor)
            .with_compression(ParquetCompression::Zstd(None))
            .with_statistics(StatisticsOptions::default())
            .finish(&mut clone)?;
    }
    Ok(buffer)
}

pub fn write_parquet(df: &DataFrame, path: &Path) -> Result<()> {
    let bytes = parquet_bytes(df)?;
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}

/// Gap reports keyed by parameter, pretty-printed.
pub fn gap_reports_json(output: &ProcessingOutput) -> Result<String> {
    let reports: BTreeMap<&str, &GapReport> = output.gap_reports();
    Ok(serde_json::to_string_pretty(&reports)?)
}
