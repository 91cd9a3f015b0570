use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone as _, Utc};
use chrono_tz::Tz;

use crate::errors::NormalizeError;

static OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

static NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

static BLANK_MARKERS: &[&str] = &["nan", "na", "n/a", "null", "none"];

pub(crate) fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || BLANK_MARKERS
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

/// Parses a timestamp cell into UTC. Values carrying an offset are converted
/// directly; naive values are read as wall-clock time in `source_tz`.
pub(crate) fn parse_timestamp(
    column: &str,
    value: &str,
    line_index: usize,
    source_tz: Tz,
) -> Result<DateTime<Utc>, NormalizeError> {
    let trimmed = value.trim();
    if is_blank(trimmed) {
        return Err(NormalizeError::parse(
            column,
            line_index,
            trimmed,
            "timestamp is blank",
        ));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .ok_or_else(|| {
            NormalizeError::parse(column, line_index, trimmed, "unrecognized timestamp format")
        })?;

    localize(naive, source_tz).ok_or_else(|| {
        NormalizeError::parse(
            column,
            line_index,
            trimmed,
            format!("local time does not exist in {}", source_tz.name()),
        )
    })
}

// Ambiguous wall-clock times (DST fall-back) resolve to the earlier instant.
fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

pub(crate) fn parse_optional_f64(
    column: &str,
    value: &str,
    line_index: usize,
) -> Result<Option<f64>, NormalizeError> {
    let trimmed = value.trim();
    if is_blank(trimmed) {
        return Ok(None);
    }

    match trimmed.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(Some(parsed)),
        Ok(_) => Err(NormalizeError::parse(
            column,
            line_index,
            trimmed,
            "value is not finite",
        )),
        Err(err) => Err(NormalizeError::parse(
            column,
            line_index,
            trimmed,
            format!("failed to parse as float: {err}"),
        )),
    }
}

pub(crate) fn content_hash(contents: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(contents);
    hasher.finalize().to_hex().to_string()
}
