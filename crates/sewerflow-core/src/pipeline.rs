use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sewerflow_parser::{NormalizedTable, TimeSeries};
use tracing::{debug, info, warn};

use crate::config::{ProcessingConfig, QcConfig};
use crate::error::Result;
use crate::gaps::{detect_gaps, GapReport};
use crate::hydraulics::{derive_hydraulics, HydraulicSample};
use crate::qc::{run_qc_checks, QcResult};

#[derive(Debug, Clone, Serialize)]
pub struct SeriesOutput {
    pub qc: QcResult,
    pub gaps: GapReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingOutput {
    pub site: Option<String>,
    pub series: BTreeMap<String, SeriesOutput>,
    /// `None` when no pipe diameter is configured or the depth series is
    /// absent.
    pub hydraulics: Option<Vec<HydraulicSample>>,
}

impl ProcessingOutput {
    pub fn gap_reports(&self) -> BTreeMap<&str, &GapReport> {
        self.series
            .iter()
            .map(|(parameter, output)| (parameter.as_str(), &output.gaps))
            .collect()
    }
}

pub fn process_series(series: &TimeSeries, config: &QcConfig) -> SeriesOutput {
    let qc = run_qc_checks(series, config);
    let gaps = detect_gaps(series, config.expected_frequency);

    debug!(
        parameter = %series.parameter,
        missing = gaps.missing_count,
        expected = gaps.expected_count,
        "gap detection finished"
    );

    SeriesOutput { qc, gaps }
}

/// Runs QC and gap detection for every parameter, then hydraulics when a pipe
/// diameter is configured.
pub fn process_table(table: &NormalizedTable, config: &ProcessingConfig) -> Result<ProcessingOutput> {
    config.validate()?;

    let mut series = BTreeMap::new();
    for ts in table.iter() {
        let output = process_series(ts, &config.qc_for(&ts.parameter));
        info!(
            parameter = %ts.parameter,
            samples = ts.len(),
            flagged = output.qc.flagged_count(),
            missing = output.gaps.missing_count,
            "processed series"
        );
        series.insert(ts.parameter.clone(), output);
    }

    let hydraulics = derive_table_hydraulics(table, config, &series);
    let site = table.iter().find_map(|ts| ts.site.clone());

    Ok(ProcessingOutput {
        site,
        series,
        hydraulics,
    })
}

fn derive_table_hydraulics(
    table: &NormalizedTable,
    config: &ProcessingConfig,
    outputs: &BTreeMap<String, SeriesOutput>,
) -> Option<Vec<HydraulicSample>> {
    let settings = &config.hydraulics;
    let geometry = settings.geometry()?;

    let Some(depth) = table.get(&settings.depth_parameter) else {
        warn!(
            parameter = %settings.depth_parameter,
            "pipe diameter configured but depth series is missing; skipping hydraulics"
        );
        return None;
    };

    let velocity = table.get(&settings.velocity_parameter);
    let flow = table.get(&settings.flow_parameter);
    if velocity.is_none() && flow.is_none() {
        warn!(
            velocity = %settings.velocity_parameter,
            flow = %settings.flow_parameter,
            "neither velocity nor flow series present; no hydraulic samples derived"
        );
    }

    let mut exclude: HashSet<DateTime<Utc>> = HashSet::new();
    if settings.exclude_flagged {
        for parameter in [
            &settings.depth_parameter,
            &settings.velocity_parameter,
            &settings.flow_parameter,
        ] {
            if let Some(output) = outputs.get(parameter.as_str()) {
                exclude.extend(output.qc.flagged_timestamps());
            }
        }
    }

    let samples = derive_hydraulics(&geometry, depth, velocity, flow, &exclude);
    info!(
        diameter_mm = geometry.diameter_mm,
        derived = samples.len(),
        excluded = exclude.len(),
        "derived hydraulic samples"
    );
    Some(samples)
}
