use std::io::{self, Write};

use crate::config::Rounding;
use crate::stats::AggregateTable;

/// Writes `<key> <min> <mean> <max>` per key, keys in ascending byte order.
///
/// Numbers use the shortest decimal that round-trips, so `2.0` prints as `2`.
/// The mean is rounded to one decimal with `rounding`.
pub fn write_report<W: Write>(table: &AggregateTable, rounding: Rounding, mut out: W) -> io::Result<()> {
    for (key, aggregate) in table.sorted() {
        out.write_all(key)?;
        writeln!(
            out,
            " {} {} {}",
            aggregate.min,
            rounding.round_tenths(aggregate.mean()),
            aggregate.max
        )?;
    }
    out.flush()
}
