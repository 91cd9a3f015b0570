use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sewerflow_core::config::ProcessingConfig;
use sewerflow_core::pipeline::{process_series, process_table};
use sewerflow_core::qc::QcFlag;
use sewerflow_parser::{normalize_csv, NormalizeOptions, TimeSeries};

fn fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../sewerflow-parser/tests/data")
        .join(name);
    std::fs::read_to_string(path).expect("read fixture")
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
}

fn config_with_pipe(extra: &str) -> Result<ProcessingConfig> {
    let content = format!("[hydraulics]\npipe_diameter_mm = 300.0\n{extra}");
    Ok(ProcessingConfig::from_toml_str(&content)?)
}

#[test]
fn monitor_export_runs_end_to_end() -> Result<()> {
    let options = NormalizeOptions::default().with_site("SITE-A");
    let table = normalize_csv(&fixture("site_a_monitor.csv"), &options)?;
    let output = process_table(&table, &config_with_pipe("")?)?;

    assert_eq!(output.site.as_deref(), Some("SITE-A"));
    assert_eq!(
        output.series.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["depth", "flow", "velocity"]
    );

    let depth = &output.series["depth"];
    assert_eq!(depth.qc.flags.len(), 5);
    assert!(depth.qc.flags.iter().all(|f| *f == QcFlag::Ok));
    assert_eq!(depth.gaps.missing_count, 2);
    assert_eq!(
        depth.gaps.missing_timestamps,
        vec!["2024-03-01T00:15:00Z", "2024-03-01T01:00:00Z"]
    );

    let flow = &output.series["flow"];
    assert_eq!(flow.gaps.expected_count, 0);

    let hydraulics = output.hydraulics.expect("pipe diameter configured");
    let timestamps: Vec<_> = hydraulics.iter().map(|s| s.timestamp).collect();
    assert_eq!(timestamps, vec![at(0, 0), at(0, 30), at(0, 45), at(1, 15)]);

    // first of the duplicated 00:45 rows is joined with its own flow reading
    let quarter_to = &hydraulics[2];
    assert_eq!(quarter_to.depth_mm, 152.0);
    assert_eq!(quarter_to.flow_m3_s, 0.031);
    assert!((quarter_to.velocity_m_s - 0.031 / quarter_to.area_m2).abs() < 1e-12);
    Ok(())
}

#[test]
fn hydraulics_skip_flagged_samples() -> Result<()> {
    let content = "timestamp,depth,velocity\n\
                   2024-03-01 00:00:00,150,1.0\n\
                   2024-03-01 00:15:00,900,1.0\n\
                   2024-03-01 00:30:00,150,-3.0\n\
                   2024-03-01 00:45:00,150,1.0\n";
    let table = normalize_csv(content, &NormalizeOptions::default())?;

    let flagged = config_with_pipe(
        "[parameters.depth]\nmin_val = 0.0\nmax_val = 300.0\n\
         [parameters.velocity]\nmin_val = 0.0\nmax_val = 5.0\n",
    )?;
    let output = process_table(&table, &flagged)?;
    let timestamps: Vec<_> = output
        .hydraulics
        .unwrap_or_default()
        .iter()
        .map(|s| s.timestamp)
        .collect();
    assert_eq!(timestamps, vec![at(0, 0), at(0, 45)]);

    let mut keep_all = flagged.clone();
    keep_all.hydraulics.exclude_flagged = false;
    let output = process_table(&table, &keep_all)?;
    assert_eq!(output.hydraulics.map(|h| h.len()), Some(4));
    Ok(())
}

#[test]
fn hydraulics_are_absent_without_geometry_or_depth() -> Result<()> {
    let table = normalize_csv(
        "timestamp,velocity\n2024-03-01 00:00:00,1.0\n",
        &NormalizeOptions::default(),
    )?;

    let output = process_table(&table, &ProcessingConfig::default())?;
    assert!(output.hydraulics.is_none());

    let output = process_table(&table, &config_with_pipe("")?)?;
    assert!(output.hydraulics.is_none());
    Ok(())
}

#[test]
fn invalid_config_fails_before_processing() -> Result<()> {
    let table = normalize_csv(&fixture("site_a_monitor.csv"), &NormalizeOptions::default())?;
    let mut config = ProcessingConfig::default();
    config.qc.flatline_window = 0;

    assert!(process_table(&table, &config).is_err());
    Ok(())
}

#[test]
fn naive_local_timestamps_are_gridded_in_utc() -> Result<()> {
    let content = "timestamp,depth\n\
                   2024-03-10 01:30:00,1.0\n\
                   2024-03-10 03:30:00,2.0\n";
    let options = NormalizeOptions::default().with_timezone(chrono_tz::America::Chicago);
    let table = normalize_csv(content, &options)?;

    let output = process_table(&table, &ProcessingConfig::default())?;
    let gaps = &output.series["depth"].gaps;

    // the spring-forward hour does not exist, so the readings are one hour apart
    assert_eq!(gaps.expected_count, 5);
    assert_eq!(gaps.missing_count, 3);
    Ok(())
}

#[test]
fn per_parameter_frequency_drives_gap_detection() -> Result<()> {
    let base = at(0, 0);
    let series = TimeSeries::from_pairs(
        "rain",
        (0..4).map(|idx| (base + Duration::hours(idx), 0.0)),
    );
    let config = ProcessingConfig::from_toml_str("[parameters.rain]\nexpected_frequency = \"1h\"")?;

    let output = process_series(&series, &config.qc_for("rain"));
    assert!(output.gaps.is_complete());

    let output = process_series(&series, &config.qc);
    assert_eq!(output.gaps.missing_count, 9);
    Ok(())
}
