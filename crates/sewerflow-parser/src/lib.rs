pub mod errors;
mod formats;
pub mod model;
mod normalizer;

pub use errors::NormalizeError;
pub use model::{
    format_utc, utc_timestamp_series, NormalizedTable, RawRow, RawTable, Sample, SeriesSummary,
    TableSummary, TimeSeries,
};
pub use normalizer::{
    normalize, normalize_csv, summarize, NormalizeOptions, DEFAULT_TIMESTAMP_COLUMN,
};
