use std::ops::Range;

use memchr::memchr;

/// A line-aligned slice of the shared region, as offsets into it.
pub type ByteRange = Range<usize>;

/// Splits `data` into at most roughly `workers` contiguous ranges.
///
/// Every interior boundary sits just after a `\n`, so no record straddles two
/// ranges. The ranges are disjoint and cover `0..data.len()` exactly; an empty
/// region yields no ranges.
pub fn plan_chunks(data: &[u8], workers: usize) -> Vec<ByteRange> {
    let len = data.len();
    if len == 0 {
        return Vec::new();
    }
    let workers = workers.max(1);
    let chunk_size = match len / workers {
        0 => len,
        size => size,
    };

    let mut ranges = Vec::with_capacity(workers + 1);
    let mut start = 0;
    while start < len {
        let probe = start + chunk_size;
        if probe >= len {
            ranges.push(start..len);
            break;
        }
        match memchr(b'\n', &data[probe..]) {
            Some(offset) => {
                let end = probe + offset + 1;
                ranges.push(start..end);
                start = end;
            }
            None => {
                ranges.push(start..len);
                break;
            }
        }
    }
    ranges
}
