use once_cell::sync::Lazy;

use crate::config::QcConfig;
use crate::qc::QcFlag;

/// Flags values outside `[min_val, max_val]`. Skipped unless both bounds are
/// set.
pub fn check_range(values: &[f64], min_val: Option<f64>, max_val: Option<f64>) -> Vec<bool> {
    match (min_val, max_val) {
        (Some(min), Some(max)) => values.iter().map(|v| *v < min || *v > max).collect(),
        _ => vec![false; values.len()],
    }
}

/// Flags values whose z-score against the whole series reaches `threshold`.
///
/// Uses the population standard deviation. A single large outlier inflates
/// the deviation and may hide smaller spikes elsewhere in the series.
pub fn check_spike(values: &[f64], threshold: f64) -> Vec<bool> {
    let n = values.len();
    let mut flags = vec![false; n];
    if n < 3 {
        return flags;
    }

    let max_abs = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if !max_abs.is_finite() || max_abs == 0.0 {
        return flags;
    }

    // z-scores are scale-free; a power-of-two factor keeps the squares in
    // range without changing any rounding.
    let exponent = max_abs.log2().ceil().clamp(-1000.0, 1000.0) as i32;
    let scale = 2.0_f64.powi(-exponent);
    let scaled: Vec<f64> = values.iter().map(|v| v * scale).collect();

    let mean = scaled.iter().sum::<f64>() / n as f64;
    let variance = scaled.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    let std = variance.sqrt();
    if !std.is_finite() || std == 0.0 {
        return flags;
    }

    for (flag, value) in flags.iter_mut().zip(&scaled) {
        *flag = ((value - mean) / std).abs() >= threshold;
    }
    flags
}

/// Flags samples whose centred rolling standard deviation falls below
/// `tolerance`. Edge samples without a complete window stay unflagged.
pub fn check_flatline(values: &[f64], window: usize, tolerance: f64) -> Vec<bool> {
    let n = values.len();
    let mut flags = vec![false; n];
    if window < 2 || n < window {
        return flags;
    }

    let offset = (window - 1) / 2;
    for (idx, flag) in flags.iter_mut().enumerate() {
        let end = idx + 1 + offset;
        if end > n || end < window {
            continue;
        }
        let slice = &values[end - window..end];
        *flag = sample_std(slice) < tolerance;
    }
    flags
}

fn sample_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

pub trait QcCheck: Send + Sync {
    fn code_identifier(&self) -> &'static str;

    fn flag(&self) -> QcFlag;

    fn evaluate(&self, values: &[f64], config: &QcConfig) -> Vec<bool>;
}

struct RangeCheck;

impl QcCheck for RangeCheck {
    fn code_identifier(&self) -> &'static str {
        "range_v1"
    }

    fn flag(&self) -> QcFlag {
        QcFlag::Range
    }

    fn evaluate(&self, values: &[f64], config: &QcConfig) -> Vec<bool> {
        check_range(values, config.min_val, config.max_val)
    }
}

struct SpikeCheck;

impl QcCheck for SpikeCheck {
    fn code_identifier(&self) -> &'static str {
        "spike_zscore_v1"
    }

    fn flag(&self) -> QcFlag {
        QcFlag::Spike
    }

    fn evaluate(&self, values: &[f64], config: &QcConfig) -> Vec<bool> {
        check_spike(values, config.spike_threshold)
    }
}

struct FlatlineCheck;

impl QcCheck for FlatlineCheck {
    fn code_identifier(&self) -> &'static str {
        "flatline_rolling_std_v1"
    }

    fn flag(&self) -> QcFlag {
        QcFlag::Flat
    }

    fn evaluate(&self, values: &[f64], config: &QcConfig) -> Vec<bool> {
        check_flatline(values, config.flatline_window, config.flatline_tolerance)
    }
}

static CHECKS: Lazy<Vec<&'static dyn QcCheck>> = Lazy::new(|| {
    vec![
        &RangeCheck as &dyn QcCheck,
        &SpikeCheck as &dyn QcCheck,
        &FlatlineCheck as &dyn QcCheck,
    ]
});

pub fn all_checks() -> &'static [&'static dyn QcCheck] {
    CHECKS.as_slice()
}
