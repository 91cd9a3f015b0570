use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use polars::prelude::{NamedFrom, Series};
use sewerflow_core::hydraulics::HydraulicSample;
use sewerflow_core::outputs::{hydraulic_frame, write_parquet};
use sewerflow_core::pipeline::process_table;
use tracing::{info, warn};

use super::{format_optional, load_tables, resolve_config, stack_frames, InputArgs};

#[derive(Args, Debug)]
pub struct HydraulicsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Pipe diameter in millimetres; overrides the config file
    #[arg(long)]
    pub diameter_mm: Option<f64>,

    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the derived samples as Parquet
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn handle_hydraulics_command(args: &HydraulicsArgs) -> Result<()> {
    let mut config = resolve_config(args.config.as_deref())?;
    if let Some(diameter) = args.diameter_mm {
        config.hydraulics.pipe_diameter_mm = Some(diameter);
    }
    if config.hydraulics.pipe_diameter_mm.is_none() {
        bail!("no pipe diameter: pass --diameter-mm or set hydraulics.pipe_diameter_mm");
    }

    let tables = load_tables(&args.input)?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Site",
        "Derived",
        "Mean depth (mm)",
        "Mean flow (m³/s)",
        "Peak flow (m³/s)",
        "Mean velocity (m/s)",
    ]);

    let mut frames = Vec::new();
    for loaded in &tables {
        let output = process_table(&loaded.table, &config)
            .with_context(|| format!("failed to process {}", loaded.path.display()))?;

        let Some(samples) = output.hydraulics else {
            warn!(path = %loaded.path.display(), "no hydraulic samples derived");
            continue;
        };

        let count = samples.len();
        let mean = |pick: fn(&HydraulicSample) -> f64| {
            (count > 0).then(|| samples.iter().map(pick).sum::<f64>() / count as f64)
        };
        let peak_flow = samples
            .iter()
            .map(|s| s.flow_m3_s)
            .fold(None, |acc: Option<f64>, q| Some(acc.map_or(q, |m| m.max(q))));

        table.add_row(vec![
            loaded.site.clone(),
            count.to_string(),
            format_optional(mean(|s| s.depth_mm)),
            format_optional(mean(|s| s.flow_m3_s)),
            format_optional(peak_flow),
            format_optional(mean(|s| s.velocity_m_s)),
        ]);

        if args.output.is_some() {
            let mut df = hydraulic_frame(&samples)?;
            let sites = Series::new("site".into(), vec![loaded.site.as_str(); df.height()]);
            df.insert_column(0, sites)?;
            frames.push(df);
        }
    }

    println!("{table}");

    if let Some(path) = &args.output {
        if let Some(df) = stack_frames(frames)? {
            write_parquet(&df, path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), rows = df.height(), "wrote hydraulic samples");
        }
    }

    Ok(())
}
