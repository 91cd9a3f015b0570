pub mod area;
pub mod hydraulics;
pub mod qc;
pub mod summarize;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use clap::Args;
use polars::prelude::DataFrame;
use sewerflow_core::config::ProcessingConfig;
use sewerflow_parser::{normalize_csv, NormalizeOptions, NormalizedTable, DEFAULT_TIMESTAMP_COLUMN};
use tracing::{info, warn};

pub const CONFIG_ENV_VAR: &str = "SEWERFLOW_CONFIG";

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// CSV file or glob pattern (e.g. `data/**/*.csv`)
    #[arg(short, long)]
    pub input: String,

    /// Site label attached to every series; defaults to the file stem
    #[arg(long)]
    pub site: Option<String>,

    /// IANA timezone for timestamps without an offset
    #[arg(long, default_value = "UTC")]
    pub timezone: String,

    #[arg(long, default_value = DEFAULT_TIMESTAMP_COLUMN)]
    pub timestamp_column: String,
}

pub struct LoadedTable {
    pub path: PathBuf,
    pub site: String,
    pub table: NormalizedTable,
}

pub fn load_tables(args: &InputArgs) -> Result<Vec<LoadedTable>> {
    let timezone: Tz = args
        .timezone
        .parse()
        .map_err(|err| anyhow!("unknown timezone '{}': {err}", args.timezone))?;

    let mut loaded = Vec::new();
    for path in expand_input(&args.input)? {
        let site = args.site.clone().unwrap_or_else(|| site_from_path(&path));
        let options = NormalizeOptions::default()
            .with_timestamp_column(args.timestamp_column.clone())
            .with_site(site.clone())
            .with_timezone(timezone);

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let table = normalize_csv(&content, &options)
            .with_context(|| format!("failed to normalize {}", path.display()))?;

        info!(
            path = %path.display(),
            site = %site,
            rows = table.row_count,
            parameters = table.series.len(),
            "loaded monitor export"
        );
        loaded.push(LoadedTable { path, site, table });
    }
    Ok(loaded)
}

fn expand_input(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in glob::glob(pattern).with_context(|| format!("invalid input pattern '{pattern}'"))? {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(err) => warn!(error = %err, "could not read path from glob pattern"),
        }
    }

    if paths.is_empty() {
        bail!("no input files matched '{pattern}'");
    }
    paths.sort();
    Ok(paths)
}

fn site_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `--config`, else `SEWERFLOW_CONFIG`, else built-in defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ProcessingConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

    match path {
        Some(path) => {
            let config = ProcessingConfig::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            info!(path = %path.display(), "loaded processing config");
            Ok(config)
        }
        None => Ok(ProcessingConfig::default()),
    }
}

/// Stacks per-file frames into one output frame.
pub fn stack_frames(frames: Vec<DataFrame>) -> Result<Option<DataFrame>> {
    let mut frames = frames.into_iter();
    let Some(mut stacked) = frames.next() else {
        return Ok(None);
    };
    for frame in frames {
        stacked
            .vstack_mut(&frame)
            .context("failed to stack output frames")?;
    }
    Ok(Some(stacked))
}

pub fn format_optional(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".to_string())
}
