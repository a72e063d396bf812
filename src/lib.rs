//! Per-key min/mean/max over a large `key;value` file.
//!
//! The input is mapped once and split into line-aligned ranges. Each worker
//! builds a private table for its range, the tables are merged, and the result
//! is written sorted by key.

pub mod config;
pub mod error;
pub mod parse;
pub mod pipeline;
pub mod planner;
pub mod reduce;
pub mod report;
pub mod source;
pub mod stats;
pub mod worker;

use std::io::Write;
use std::path::Path;
use std::time::Instant;

pub use config::{Config, MalformedPolicy, ParserMode, Rounding, Strategy};
pub use error::{Error, Result};
pub use pipeline::{aggregate, Aggregation, RunSummary};
pub use source::MappedFile;
pub use stats::{Aggregate, AggregateTable};

/// Aggregates `data` and writes the report to `out`.
pub fn process_data<W: Write>(data: &[u8], config: &Config, out: W) -> Result<RunSummary> {
    let Aggregation { table, mut summary } = aggregate(data, config)?;
    let started = Instant::now();
    report::write_report(&table, config.rounding, out)?;
    summary.report_time = started.elapsed();
    Ok(summary)
}

/// Maps the file at `path` and processes it.
pub fn process_file<W: Write>(path: impl AsRef<Path>, config: &Config, out: W) -> Result<RunSummary> {
    let source = MappedFile::open(path)?;
    process_data(&source, config, out)
}
