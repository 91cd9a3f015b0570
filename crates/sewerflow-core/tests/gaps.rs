use chrono::{DateTime, Duration, TimeZone, Utc};

use sewerflow_core::config::ExpectedFrequency;
use sewerflow_core::gaps::{detect_gaps, find_missing_timestamps, MAX_REPORTED_GAPS};
use sewerflow_parser::TimeSeries;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
}

fn fifteen_minutes() -> ExpectedFrequency {
    "15min".parse().unwrap()
}

#[test]
fn reports_missing_grid_points() {
    let series = TimeSeries::from_pairs(
        "depth",
        [(at(0, 0), 1.0), (at(0, 30), 1.0), (at(1, 0), 1.0)],
    );

    let report = detect_gaps(&series, fifteen_minutes());

    assert_eq!(report.expected_count, 5);
    assert_eq!(report.missing_count, 2);
    assert_eq!(
        report.missing_timestamps,
        vec!["2024-03-01T00:15:00Z", "2024-03-01T00:45:00Z"]
    );
    assert!(!report.is_complete());
}

#[test]
fn empty_and_single_sample_series_have_no_gaps() {
    let report = find_missing_timestamps(&[], fifteen_minutes());
    assert_eq!(report.missing_count, 0);
    assert!(report.missing_timestamps.is_empty());

    let report = find_missing_timestamps(&[at(3, 0)], fifteen_minutes());
    assert_eq!(report.missing_count, 0);
    assert_eq!(report.expected_count, 0);
}

#[test]
fn duplicates_satisfy_their_grid_point_once() {
    let timestamps = [at(0, 0), at(0, 15), at(0, 15), at(0, 30)];
    let report = find_missing_timestamps(&timestamps, fifteen_minutes());

    assert_eq!(report.expected_count, 3);
    assert!(report.is_complete());
}

#[test]
fn off_grid_samples_do_not_fill_gaps() {
    let timestamps = [at(0, 0), at(0, 17), at(0, 30)];
    let report = find_missing_timestamps(&timestamps, fifteen_minutes());

    assert_eq!(report.missing_timestamps, vec!["2024-03-01T00:15:00Z"]);
}

#[test]
fn unsorted_input_uses_min_and_max() {
    let timestamps = [at(1, 0), at(0, 0)];
    let report = find_missing_timestamps(&timestamps, "30min".parse().unwrap());

    assert_eq!(report.missing_timestamps, vec!["2024-03-01T00:30:00Z"]);
}

#[test]
fn listing_is_truncated_but_count_is_exact() {
    let start = at(0, 0);
    let end = start + Duration::minutes(15 * 250);
    let report = find_missing_timestamps(&[start, end], fifteen_minutes());

    assert_eq!(report.expected_count, 251);
    assert_eq!(report.missing_count, 249);
    assert_eq!(report.missing_timestamps.len(), MAX_REPORTED_GAPS);
    assert_eq!(report.missing_timestamps[0], "2024-03-01T00:15:00Z");
}

#[test]
fn hourly_frequency_aliases() {
    let timestamps = [at(0, 0), at(3, 0)];
    for alias in ["1h", "H", "60min", "3600s"] {
        let frequency: ExpectedFrequency = alias.parse().unwrap();
        let report = find_missing_timestamps(&timestamps, frequency);
        assert_eq!(report.missing_count, 2, "alias {alias}");
    }
}

#[test]
fn report_serializes_for_persistence() {
    let series = TimeSeries::from_pairs("flow", [(at(0, 0), 1.0), (at(0, 30), 1.0)]);
    let report = detect_gaps(&series, fifteen_minutes());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["missing_count"], 1);
    assert_eq!(json["missing_timestamps"][0], "2024-03-01T00:15:00Z");
}

#[test]
fn sub_second_grid_points_keep_their_fraction() {
    let start = at(0, 0) + Duration::milliseconds(500);
    let timestamps = [start, start + Duration::seconds(60)];
    let report = find_missing_timestamps(&timestamps, "30s".parse().unwrap());

    assert_eq!(report.missing_timestamps, vec!["2024-03-01T00:00:30.500Z"]);
}
