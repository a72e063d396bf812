use memchr::{memchr, memchr_iter};
use tracing::trace;

use crate::config::MalformedPolicy;
use crate::error::{Error, Malformation, Result};
use crate::parse::DecimalParser;
use crate::planner::ByteRange;
use crate::stats::AggregateTable;

/// What one worker hands to the reducer.
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub table: AggregateTable,
    pub records: u64,
    pub skipped: u64,
}

/// Scans `data[range]` into a private table.
pub fn scan_range<P>(
    data: &[u8],
    range: ByteRange,
    parser: &P,
    policy: MalformedPolicy,
) -> Result<ScanOutput>
where
    P: DecimalParser + ?Sized,
{
    let mut table = AggregateTable::new();
    let mut records = 0u64;
    let skipped = scan_records(data, range, parser, policy, |key, value| {
        table.record(key, value);
        records += 1;
    })?;
    Ok(ScanOutput {
        table,
        records,
        skipped,
    })
}

/// Feeds every record of `data[range]` to `on_record` and returns how many
/// lines the policy skipped. Empty lines are not records and are not counted.
pub(crate) fn scan_records<'a, P, F>(
    data: &'a [u8],
    range: ByteRange,
    parser: &P,
    policy: MalformedPolicy,
    mut on_record: F,
) -> Result<u64>
where
    P: DecimalParser + ?Sized,
    F: FnMut(&'a [u8], f64),
{
    let base = range.start;
    let chunk = &data[range];
    let mut skipped = 0u64;
    let mut start = 0;
    for end in memchr_iter(b'\n', chunk).chain(std::iter::once(chunk.len())) {
        let line = &chunk[start..end];
        let offset = base + start;
        start = end + 1;
        if line.is_empty() {
            continue;
        }
        match parse_record(line, offset, parser) {
            Ok((key, value)) => on_record(key, value),
            Err(err) if policy == MalformedPolicy::Skip && err.is_record_error() => {
                trace!(%err, "skipping line");
                skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(skipped)
}

/// Splits `key;value` on the first `;` and parses the value.
/// `offset` is the line's position in the whole region, for diagnostics.
#[inline]
pub(crate) fn parse_record<'a, P>(line: &'a [u8], offset: usize, parser: &P) -> Result<(&'a [u8], f64)>
where
    P: DecimalParser + ?Sized,
{
    let Some(split) = memchr(b';', line) else {
        return Err(Error::malformed(offset, Malformation::MissingDelimiter, line));
    };
    let (key, text) = (&line[..split], &line[split + 1..]);
    if key.is_empty() {
        return Err(Error::malformed(offset, Malformation::EmptyKey, line));
    }
    let value = parser
        .parse(text)
        .map_err(|source| Error::invalid_number(offset + split + 1, text, source))?;
    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{BestEffort, Strict};

    fn scan(data: &[u8], policy: MalformedPolicy) -> Result<ScanOutput> {
        scan_range(data, 0..data.len(), &BestEffort, policy)
    }

    #[test]
    fn scans_terminated_and_unterminated_lines() {
        let data = b"Tehran;10.4\nTehran;11.4\nTbilisi;1.6";
        let output = scan(data, MalformedPolicy::Abort).unwrap();
        assert_eq!(output.records, 3);
        assert_eq!(output.table.len(), 2);
        let tehran = output.table.get(b"Tehran").unwrap();
        assert_eq!((tehran.min, tehran.max, tehran.count), (10.4, 11.4, 2));
        assert_eq!(output.table.get(b"Tbilisi").unwrap().sum, 1.6);
    }

    #[test]
    fn empty_lines_produce_nothing() {
        let output = scan(b"\n\nX;5.2\n\n", MalformedPolicy::Abort).unwrap();
        assert_eq!(output.records, 1);
        assert_eq!(output.skipped, 0);
    }

    #[test]
    fn only_the_given_range_is_scanned() {
        let data = b"a;1\nb;2\nc;3\n";
        let output = scan_range(data, 4..8, &BestEffort, MalformedPolicy::Abort).unwrap();
        assert_eq!(output.records, 1);
        assert!(output.table.get(b"b").is_some());
    }

    #[test]
    fn missing_delimiter_aborts_with_offset() {
        let data = b"a;1\nbogus\nc;3\n";
        let err = scan(data, MalformedPolicy::Abort).unwrap_err();
        match err {
            Error::Malformed { offset, reason, line } => {
                assert_eq!(offset, 4);
                assert_eq!(reason, Malformation::MissingDelimiter);
                assert_eq!(line, "bogus");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn skip_policy_counts_bad_lines() {
        let data = b"a;1\nbogus\n;4\nc;3\n";
        let output = scan(data, MalformedPolicy::Skip).unwrap();
        assert_eq!(output.records, 2);
        assert_eq!(output.skipped, 2);
    }

    #[test]
    fn first_delimiter_splits_the_key() {
        let (key, value) = parse_record(b"a;1;2", 0, &BestEffort).unwrap();
        assert_eq!(key, b"a");
        // "1;2" is not a well-formed value; best effort keeps the prefix.
        assert_eq!(value, 1.0);
        assert!(parse_record(b"a;1;2", 0, &Strict).is_err());
    }

    #[test]
    fn strict_parser_errors_follow_the_policy() {
        let data = b"a;1.5\nb;x\n";
        let err = scan_range(data, 0..data.len(), &Strict, MalformedPolicy::Abort).unwrap_err();
        assert!(matches!(err, Error::InvalidNumber { offset: 8, .. }));

        let output = scan_range(data, 0..data.len(), &Strict, MalformedPolicy::Skip).unwrap();
        assert_eq!((output.records, output.skipped), (1, 1));
    }
}
