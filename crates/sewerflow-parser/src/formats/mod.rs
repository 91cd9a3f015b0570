mod common;
mod delimited;

pub(crate) use common::{content_hash, parse_optional_f64, parse_timestamp};
