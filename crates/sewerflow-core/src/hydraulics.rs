//! Pipe geometry and the area / velocity / discharge relations.
//!
//! Depth and diameter are in millimetres; every derived quantity is SI
//! (m², m/s, m³/s). Degenerate inputs resolve to `0.0` rather than erroring.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sewerflow_parser::{Sample, TimeSeries};

const MM_TO_M: f64 = 1000.0;

/// Cross-section shape. Only circular pipes have an area formula today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipeShape {
    #[default]
    Circular,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipeGeometry {
    pub shape: PipeShape,
    pub diameter_mm: f64,
}

impl PipeGeometry {
    pub fn circular(diameter_mm: f64) -> Self {
        Self {
            shape: PipeShape::Circular,
            diameter_mm,
        }
    }

    /// Wetted cross-section at the given depth.
    pub fn flow_area_m2(&self, depth_mm: f64) -> f64 {
        match self.shape {
            PipeShape::Circular => circular_area(self.diameter_mm, depth_mm),
        }
    }

    pub fn full_area_m2(&self) -> f64 {
        self.flow_area_m2(self.diameter_mm)
    }
}

/// Area of the circular segment filled to `depth_mm` in a pipe of
/// `diameter_mm`. Surcharged pipes (depth above the crown) report the full
/// bore.
pub fn circular_area(diameter_mm: f64, depth_mm: f64) -> f64 {
    if !diameter_mm.is_finite() || !depth_mm.is_finite() {
        return 0.0;
    }
    if depth_mm <= 0.0 || diameter_mm <= 0.0 {
        return 0.0;
    }

    let diameter = diameter_mm / MM_TO_M;
    let depth = depth_mm / MM_TO_M;
    let radius = diameter / 2.0;

    if depth >= diameter {
        return PI * radius * radius;
    }

    let theta = 2.0 * ((radius - depth) / radius).clamp(-1.0, 1.0).acos();
    (radius * radius / 2.0) * (theta - theta.sin())
}

pub fn compute_flow(area_m2: f64, velocity_m_s: f64) -> f64 {
    area_m2 * velocity_m_s
}

pub fn compute_velocity(flow_m3_s: f64, area_m2: f64) -> f64 {
    if area_m2 <= 0.0 {
        return 0.0;
    }
    flow_m3_s / area_m2
}

/// The one measured quantity supplied alongside depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KnownQuantity {
    Velocity(f64),
    Flow(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HydraulicSample {
    pub timestamp: DateTime<Utc>,
    pub depth_mm: f64,
    pub area_m2: f64,
    pub flow_m3_s: f64,
    pub velocity_m_s: f64,
}

impl HydraulicSample {
    pub fn from_depth(
        timestamp: DateTime<Utc>,
        geometry: &PipeGeometry,
        depth_mm: f64,
        known: KnownQuantity,
    ) -> Self {
        let area_m2 = geometry.flow_area_m2(depth_mm);
        let (flow_m3_s, velocity_m_s) = match known {
            KnownQuantity::Velocity(velocity) => (compute_flow(area_m2, velocity), velocity),
            KnownQuantity::Flow(flow) => (flow, compute_velocity(flow, area_m2)),
        };

        Self {
            timestamp,
            depth_mm,
            area_m2,
            flow_m3_s,
            velocity_m_s,
        }
    }
}

/// Joins depth with velocity (preferred) or flow on timestamp and derives the
/// missing quantity for every depth sample not listed in `exclude`.
///
/// Only the first depth sample at a timestamp is used. When the partner
/// series carry input rows, a depth reading is paired only with readings from
/// its own row.
pub fn derive_hydraulics(
    geometry: &PipeGeometry,
    depth: &TimeSeries,
    velocity: Option<&TimeSeries>,
    flow: Option<&TimeSeries>,
    exclude: &HashSet<DateTime<Utc>>,
) -> Vec<HydraulicSample> {
    let velocity_at = velocity.map(group_by_timestamp);
    let flow_at = flow.map(group_by_timestamp);

    let mut seen = HashSet::new();
    let mut samples = Vec::new();

    for sample in depth.samples() {
        if !seen.insert(sample.timestamp) || exclude.contains(&sample.timestamp) {
            continue;
        }

        let known = velocity_at
            .as_ref()
            .and_then(|lookup| partner_value(lookup, sample))
            .map(KnownQuantity::Velocity)
            .or_else(|| {
                flow_at
                    .as_ref()
                    .and_then(|lookup| partner_value(lookup, sample))
                    .map(KnownQuantity::Flow)
            });

        if let Some(known) = known {
            samples.push(HydraulicSample::from_depth(
                sample.timestamp,
                geometry,
                sample.value,
                known,
            ));
        }
    }

    samples
}

fn group_by_timestamp(series: &TimeSeries) -> HashMap<DateTime<Utc>, Vec<Sample>> {
    let mut lookup: HashMap<DateTime<Utc>, Vec<Sample>> = HashMap::with_capacity(series.len());
    for sample in series.samples() {
        lookup.entry(sample.timestamp).or_default().push(*sample);
    }
    lookup
}

fn partner_value(lookup: &HashMap<DateTime<Utc>, Vec<Sample>>, depth: &Sample) -> Option<f64> {
    let candidates = lookup.get(&depth.timestamp)?;
    let partner = match depth.row {
        Some(row) if candidates.iter().any(|c| c.row.is_some()) => {
            candidates.iter().find(|c| c.row == Some(row))
        }
        _ => candidates.first(),
    };
    partner.map(|c| c.value)
}
