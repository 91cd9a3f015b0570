use csv::{ReaderBuilder, Trim};

use crate::errors::NormalizeError;
use crate::formats::content_hash;
use crate::model::{RawRow, RawTable};

impl RawTable {
    /// Reads comma-separated text with a header row. Every data row must have
    /// the header's width.
    pub fn from_csv(content: &str) -> Result<Self, NormalizeError> {
        let source_hash = content_hash(content.as_bytes());
        let body = content.strip_prefix('\u{feff}').unwrap_or(content);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(body.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(NormalizeError::EmptyHeader);
        }

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let line_index = record
                .position()
                .map(|pos| pos.line() as usize)
                .unwrap_or(idx + 2);

            if record.len() != headers.len() {
                return Err(NormalizeError::RowWidth {
                    line_index,
                    expected: headers.len(),
                    found: record.len(),
                });
            }

            rows.push(RawRow {
                line_index,
                fields: record.iter().map(str::to_string).collect(),
            });
        }

        Ok(RawTable {
            headers,
            rows,
            source_hash: Some(source_hash),
        })
    }
}
