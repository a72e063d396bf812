//! Combining partial results.
//!
//! Every function here consumes owned tables and returns a new owned table;
//! nothing is shared between the workers that produced them.

use crate::stats::AggregateTable;
use crate::worker::ScanOutput;

/// Merges two tables. Commutative and associative up to floating-point
/// rounding of `sum`.
pub fn merge_tables(into: AggregateTable, from: AggregateTable) -> AggregateTable {
    // Fold the smaller table into the larger one.
    let (mut into, from) = if into.len() >= from.len() {
        (into, from)
    } else {
        (from, into)
    };
    for (key, aggregate) in from {
        into.merge_entry(key, aggregate);
    }
    into
}

/// Folds any number of tables into one global table.
pub fn reduce_tables<I>(tables: I) -> AggregateTable
where
    I: IntoIterator<Item = AggregateTable>,
{
    tables.into_iter().fold(AggregateTable::new(), merge_tables)
}

pub fn merge_outputs(a: ScanOutput, b: ScanOutput) -> ScanOutput {
    ScanOutput {
        table: merge_tables(a.table, b.table),
        records: a.records + b.records,
        skipped: a.skipped + b.skipped,
    }
}
