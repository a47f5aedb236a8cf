// Low-complexity region detection
//
// A region is a repeat of period p when every base equals the base p
// positions earlier. Non-ACGT characters all compare equal to each other, so
// long stretches of N (or mixed ambiguity codes) are masked as well.

use std::ops::Range;

use super::qgram::base_to_code;

#[inline]
fn same_base(a: u8, b: u8) -> bool {
    match (base_to_code(a), base_to_code(b)) {
        (Some(x), Some(y)) => x == y,
        (None, None) => true,
        _ => false,
    }
}

/// Maximal regions of `seq` with a period of at most `max_period` spanning
/// at least `min_len` bases.
///
/// Returns sorted, non-overlapping ranges; overlapping or touching repeats of
/// different periods are merged.
pub fn find_repeats(seq: &[u8], min_len: usize, max_period: usize) -> Vec<Range<usize>> {
    let mut found: Vec<Range<usize>> = Vec::new();
    if min_len == 0 || max_period == 0 {
        return found;
    }

    for period in 1..=max_period {
        if seq.len() <= period {
            break;
        }
        let mut start = 0;
        for i in period..=seq.len() {
            if i < seq.len() && same_base(seq[i], seq[i - period]) {
                continue;
            }
            // seq[start..i] has period `period`
            let len = i - start;
            if len >= min_len && len > period {
                found.push(start..i);
            }
            start = i + 1 - period;
        }
    }

    found.sort_by_key(|r| (r.start, r.end));
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(found.len());
    for range in found {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }

    log::trace!("find_repeats: {} regions in {} bases", merged.len(), seq.len());
    merged
}

/// Complement of the sorted, disjoint `masked` ranges within `0..len`.
pub fn unmasked_ranges(masked: &[Range<usize>], len: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::with_capacity(masked.len() + 1);
    let mut cursor = 0;
    for range in masked {
        if range.start > cursor {
            ranges.push(cursor..range.start.min(len));
        }
        cursor = cursor.max(range.end);
        if cursor >= len {
            break;
        }
    }
    if cursor < len {
        ranges.push(cursor..len);
    }
    ranges
}
