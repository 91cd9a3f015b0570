use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};

use sewerflow_core::hydraulics::{
    circular_area, compute_flow, compute_velocity, derive_hydraulics, HydraulicSample,
    KnownQuantity, PipeGeometry,
};
use sewerflow_parser::{Sample, TimeSeries};

fn at(m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, m, 0).unwrap()
}

fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}

#[test]
fn half_full_pipe_is_half_the_bore() {
    let geometry = PipeGeometry::circular(300.0);

    let full = geometry.full_area_m2();
    let half = geometry.flow_area_m2(150.0);

    assert!(close(full, 0.070686, 1e-6), "full area {full}");
    assert!(close(half, 0.035343, 1e-6), "half area {half}");
    assert!(close(half * 2.0, full, 1e-12));
}

#[test]
fn degenerate_depths_and_diameters_are_zero() {
    assert_eq!(circular_area(300.0, 0.0), 0.0);
    assert_eq!(circular_area(300.0, -5.0), 0.0);
    assert_eq!(circular_area(0.0, 100.0), 0.0);
    assert_eq!(circular_area(-300.0, 100.0), 0.0);
    assert_eq!(circular_area(300.0, f64::NAN), 0.0);
    assert_eq!(circular_area(f64::INFINITY, 10.0), 0.0);
}

#[test]
fn surcharged_pipe_reports_full_bore() {
    let full = circular_area(450.0, 450.0);
    assert_eq!(circular_area(450.0, 451.0), full);
    assert_eq!(circular_area(450.0, 2_000.0), full);
}

#[test]
fn area_is_monotone_and_continuous_at_crown() {
    let diameter = 600.0;
    let mut previous = 0.0;
    for step in 0..=600 {
        let area = circular_area(diameter, step as f64);
        assert!(area >= previous, "area dropped at depth {step}");
        previous = area;
    }

    let just_below = circular_area(diameter, diameter - 1e-6);
    assert!(close(just_below, circular_area(diameter, diameter), 1e-9));
}

#[test]
fn flow_and_velocity_round_trip() {
    for area in [0.001, 0.035343, 1.5] {
        for velocity in [-0.4, 0.0, 0.82, 3.1] {
            let flow = compute_flow(area, velocity);
            assert!(close(compute_velocity(flow, area), velocity, 1e-12));
        }
    }
}

#[test]
fn zero_area_velocity_is_zero() {
    assert_eq!(compute_velocity(0.5, 0.0), 0.0);
    assert_eq!(compute_velocity(0.5, -1.0), 0.0);
}

#[test]
fn sample_from_depth_and_velocity() {
    let geometry = PipeGeometry::circular(300.0);
    let sample = HydraulicSample::from_depth(at(0), &geometry, 150.0, KnownQuantity::Velocity(1.0));

    assert!(close(sample.area_m2, 0.035343, 1e-6));
    assert!(close(sample.flow_m3_s, 0.035343, 1e-6));
    assert_eq!(sample.velocity_m_s, 1.0);
}

#[test]
fn sample_from_dry_pipe_and_flow() {
    let geometry = PipeGeometry::circular(300.0);
    let sample = HydraulicSample::from_depth(at(0), &geometry, 0.0, KnownQuantity::Flow(0.2));

    assert_eq!(sample.area_m2, 0.0);
    assert_eq!(sample.flow_m3_s, 0.2);
    assert_eq!(sample.velocity_m_s, 0.0);
}

#[test]
fn derive_prefers_velocity_and_skips_excluded() {
    let geometry = PipeGeometry::circular(300.0);
    let depth = TimeSeries::from_pairs(
        "depth",
        [
            (at(0), 150.0),
            (at(15), 150.0),
            (at(15), 999.0),
            (at(30), 150.0),
            (at(45), 150.0),
        ],
    );
    let velocity = TimeSeries::from_pairs("velocity", [(at(0), 1.0), (at(15), 2.0)]);
    let flow = TimeSeries::from_pairs("flow", [(at(0), 9.0), (at(30), 0.07)]);
    let exclude: HashSet<_> = [at(45)].into_iter().collect();

    let samples = derive_hydraulics(&geometry, &depth, Some(&velocity), Some(&flow), &exclude);

    let timestamps: Vec<_> = samples.iter().map(|s| s.timestamp).collect();
    assert_eq!(timestamps, vec![at(0), at(15), at(30)]);

    assert_eq!(samples[0].velocity_m_s, 1.0);
    assert_eq!(samples[1].depth_mm, 150.0);
    assert_eq!(samples[1].velocity_m_s, 2.0);
    assert_eq!(samples[2].flow_m3_s, 0.07);
    assert!(close(samples[2].velocity_m_s, 0.07 / 0.035343, 1e-3));
}

#[test]
fn derive_without_partner_series_is_empty() {
    let geometry = PipeGeometry::circular(300.0);
    let depth = TimeSeries::from_pairs("depth", [(at(0), 100.0)]);

    let samples = derive_hydraulics(&geometry, &depth, None, None, &HashSet::new());
    assert!(samples.is_empty());
}

#[test]
fn derive_pairs_readings_from_the_same_row() {
    let geometry = PipeGeometry::circular(300.0);
    let depth = TimeSeries::new(
        None,
        "depth",
        vec![
            Sample::new(at(45), 152.0).with_row(5),
            Sample::new(at(45), 152.4).with_row(6),
        ],
    );
    let velocity = TimeSeries::new(None, "velocity", vec![Sample::new(at(45), 0.84).with_row(6)]);
    let flow = TimeSeries::new(None, "flow", vec![Sample::new(at(45), 0.031).with_row(5)]);

    let samples = derive_hydraulics(&geometry, &depth, Some(&velocity), Some(&flow), &HashSet::new());

    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].depth_mm, 152.0);
    assert_eq!(samples[0].flow_m3_s, 0.031);
    assert!(close(samples[0].velocity_m_s, 0.031 / samples[0].area_m2, 1e-12));
}

#[test]
fn row_without_partner_reading_is_skipped() {
    let geometry = PipeGeometry::circular(300.0);
    let depth = TimeSeries::new(None, "depth", vec![Sample::new(at(0), 100.0).with_row(2)]);
    let velocity = TimeSeries::new(None, "velocity", vec![Sample::new(at(0), 0.5).with_row(3)]);

    let samples = derive_hydraulics(&geometry, &depth, Some(&velocity), None, &HashSet::new());
    assert!(samples.is_empty());
}
