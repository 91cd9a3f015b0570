use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use sewerflow_core::outputs::{qc_frame, write_parquet};
use sewerflow_core::pipeline::process_table;
use sewerflow_core::qc::QcFlag;
use tracing::info;

use super::{load_tables, resolve_config, stack_frames, InputArgs};

#[derive(Args, Debug)]
pub struct QcArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// TOML processing config (falls back to $SEWERFLOW_CONFIG)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the per-sample flags as Parquet
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write gap reports as JSON, keyed by input file then parameter
    #[arg(long)]
    pub gaps_json: Option<PathBuf>,
}

pub fn handle_qc_command(args: &QcArgs) -> Result<()> {
    let config = resolve_config(args.config.as_deref())?;
    let tables = load_tables(&args.input)?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Site",
        "Parameter",
        "Samples",
        "OK",
        "RANGE",
        "SPIKE",
        "FLAT",
        "Missing",
    ]);

    let mut frames = Vec::new();
    let mut gap_reports = BTreeMap::new();

    for loaded in &tables {
        let output = process_table(&loaded.table, &config)
            .with_context(|| format!("failed to process {}", loaded.path.display()))?;

        for (parameter, series) in &output.series {
            let mut row = vec![
                loaded.site.clone(),
                parameter.clone(),
                series.qc.flags.len().to_string(),
            ];
            row.extend(QcFlag::ALL.iter().map(|flag| series.qc.count(*flag).to_string()));
            row.push(series.gaps.missing_count.to_string());
            table.add_row(row);
        }

        if args.output.is_some() {
            frames.push(qc_frame(&output)?);
        }
        gap_reports.insert(loaded.path.display().to_string(), output.series);
    }

    println!("{table}");

    if let Some(path) = &args.output {
        if let Some(df) = stack_frames(frames)? {
            write_parquet(&df, path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), rows = df.height(), "wrote qc flags");
        }
    }

    if let Some(path) = &args.gaps_json {
        let reports: BTreeMap<&str, BTreeMap<&str, _>> = gap_reports
            .iter()
            .map(|(file, series)| {
                let per_parameter = series
                    .iter()
                    .map(|(parameter, output)| (parameter.as_str(), &output.gaps))
                    .collect();
                (file.as_str(), per_parameter)
            })
            .collect();
        let json = serde_json::to_string_pretty(&reports)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote gap reports");
    }

    Ok(())
}
