use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sewerflow_parser::{format_utc, TimeSeries};

use crate::config::ExpectedFrequency;

/// Missing timestamps listed in a report; `missing_count` is never truncated.
pub const MAX_REPORTED_GAPS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapReport {
    pub expected_count: usize,
    pub missing_count: usize,
    pub missing_timestamps: Vec<String>,
}

impl GapReport {
    pub fn is_complete(&self) -> bool {
        self.missing_count == 0
    }
}

pub fn detect_gaps(series: &TimeSeries, frequency: ExpectedFrequency) -> GapReport {
    find_missing_timestamps(&series.timestamps(), frequency)
}

/// Walks the regular grid from the earliest to the latest timestamp and
/// reports grid points with no exact match.
pub fn find_missing_timestamps(
    timestamps: &[DateTime<Utc>],
    frequency: ExpectedFrequency,
) -> GapReport {
    if timestamps.len() < 2 {
        return GapReport::default();
    }

    let (Some(start), Some(end)) = (timestamps.iter().min(), timestamps.iter().max()) else {
        return GapReport::default();
    };

    let actual: HashSet<&DateTime<Utc>> = timestamps.iter().collect();
    let step = frequency.as_duration();

    let mut report = GapReport::default();
    let mut cursor = Some(*start);
    while let Some(point) = cursor {
        if point > *end {
            break;
        }
        report.expected_count += 1;
        if !actual.contains(&point) {
            report.missing_count += 1;
            if report.missing_timestamps.len() < MAX_REPORTED_GAPS {
                report.missing_timestamps.push(format_utc(point));
            }
        }
        cursor = point.checked_add_signed(step);
    }

    report
}
