use thiserror::Error;

/// Failures raised while turning raw tabular input into per-parameter series.
///
/// Line numbers are 1-based positions in the tabular input where the header
/// occupies line 1.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("column '{column}' appears more than once in the header")]
    DuplicateColumn { column: String },

    #[error("input did not contain a header row")]
    EmptyHeader,

    #[error("line {line_index} has {found} fields but the header has {expected}")]
    RowWidth {
        line_index: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line_index} column '{column}': cannot parse '{value}': {message}")]
    Parse {
        column: String,
        line_index: usize,
        value: String,
        message: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl NormalizeError {
    pub(crate) fn parse(
        column: &str,
        line_index: usize,
        value: &str,
        message: impl Into<String>,
    ) -> Self {
        NormalizeError::Parse {
            column: column.to_string(),
            line_index,
            value: value.to_string(),
            message: message.into(),
        }
    }
}
