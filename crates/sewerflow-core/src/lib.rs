pub mod config;
pub mod error;
pub mod gaps;
pub mod hydraulics;
pub mod outputs;
pub mod pipeline;
pub mod qc;
