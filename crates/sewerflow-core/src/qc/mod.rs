//! Per-sample quality flags.
//!
//! Every registered check runs over the same value vector. Each sample keeps
//! the full set of conditions it matched, and the reported flag is the
//! highest-priority member of that set.

pub mod checks;

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use sewerflow_parser::TimeSeries;
use tracing::debug;

use crate::config::QcConfig;

pub use checks::{all_checks, check_flatline, check_range, check_spike, QcCheck};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QcFlag {
    Ok,
    Range,
    Spike,
    Flat,
}

/// Resolution order when several conditions match one sample. Higher wins.
pub const FLAG_PRIORITY: [(QcFlag, u8); 4] = [
    (QcFlag::Ok, 0),
    (QcFlag::Range, 1),
    (QcFlag::Spike, 2),
    (QcFlag::Flat, 3),
];

impl QcFlag {
    pub const ALL: [QcFlag; 4] = [QcFlag::Ok, QcFlag::Range, QcFlag::Spike, QcFlag::Flat];

    pub fn as_str(&self) -> &'static str {
        match self {
            QcFlag::Ok => "OK",
            QcFlag::Range => "RANGE",
            QcFlag::Spike => "SPIKE",
            QcFlag::Flat => "FLAT",
        }
    }

    pub fn priority(&self) -> u8 {
        FLAG_PRIORITY
            .iter()
            .find(|(flag, _)| flag == self)
            .map(|(_, rank)| *rank)
            .unwrap_or(0)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, QcFlag::Ok)
    }

    fn bit(&self) -> u8 {
        match self {
            QcFlag::Ok => 0,
            QcFlag::Range => 1 << 0,
            QcFlag::Spike => 1 << 1,
            QcFlag::Flat => 1 << 2,
        }
    }
}

impl fmt::Display for QcFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conditions matched by a single sample. Empty means the sample is OK.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ConditionSet(u8);

impl ConditionSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, flag: QcFlag) {
        self.0 |= flag.bit();
    }

    pub fn contains(&self, flag: QcFlag) -> bool {
        !flag.is_ok() && self.0 & flag.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Matched conditions in ascending priority.
    pub fn iter(&self) -> impl Iterator<Item = QcFlag> + '_ {
        let set = *self;
        QcFlag::ALL
            .into_iter()
            .filter(move |flag| set.contains(*flag))
    }

    pub fn resolve(&self) -> QcFlag {
        self.iter()
            .max_by_key(QcFlag::priority)
            .unwrap_or(QcFlag::Ok)
    }
}

impl FromIterator<QcFlag> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = QcFlag>>(iter: I) -> Self {
        let mut set = ConditionSet::empty();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl fmt::Display for ConditionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .iter()
            .map(|flag| flag.as_str())
            .collect::<Vec<_>>()
            .join("|");
        f.write_str(&joined)
    }
}

impl Serialize for ConditionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let flags: Vec<QcFlag> = self.iter().collect();
        let mut seq = serializer.serialize_seq(Some(flags.len()))?;
        for flag in flags {
            seq.serialize_element(&flag)?;
        }
        seq.end()
    }
}

/// Gathers, per sample, every check whose mask is set.
pub fn collect_conditions(masks: &[(QcFlag, Vec<bool>)], len: usize) -> Vec<ConditionSet> {
    let mut conditions = vec![ConditionSet::empty(); len];
    for (flag, mask) in masks {
        for (set, hit) in conditions.iter_mut().zip(mask) {
            if *hit {
                set.insert(*flag);
            }
        }
    }
    conditions
}

pub fn aggregate_flags(masks: &[(QcFlag, Vec<bool>)], len: usize) -> Vec<QcFlag> {
    collect_conditions(masks, len)
        .iter()
        .map(ConditionSet::resolve)
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct QcResult {
    pub series: TimeSeries,
    pub flags: Vec<QcFlag>,
    pub conditions: Vec<ConditionSet>,
}

impl QcResult {
    pub fn count(&self, flag: QcFlag) -> usize {
        self.flags.iter().filter(|f| **f == flag).count()
    }

    pub fn flagged_count(&self) -> usize {
        self.flags.iter().filter(|f| !f.is_ok()).count()
    }

    /// Timestamps carrying any non-OK flag.
    pub fn flagged_timestamps(&self) -> HashSet<DateTime<Utc>> {
        self.series
            .samples()
            .iter()
            .zip(&self.flags)
            .filter(|(_, flag)| !flag.is_ok())
            .map(|(sample, _)| sample.timestamp)
            .collect()
    }
}

pub fn run_qc_checks(series: &TimeSeries, config: &QcConfig) -> QcResult {
    let values = series.values();
    let masks: Vec<(QcFlag, Vec<bool>)> = all_checks()
        .iter()
        .map(|check| (check.flag(), check.evaluate(&values, config)))
        .collect();

    let conditions = collect_conditions(&masks, values.len());
    let flags: Vec<QcFlag> = conditions.iter().map(ConditionSet::resolve).collect();

    debug!(
        parameter = %series.parameter,
        samples = values.len(),
        flagged = flags.iter().filter(|f| !f.is_ok()).count(),
        "qc checks evaluated"
    );

    QcResult {
        series: series.clone(),
        flags,
        conditions,
    }
}
