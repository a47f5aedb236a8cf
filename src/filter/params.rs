//! Bucket geometry derivation.
//!
//! Turns the error rate, the q-gram length and a pattern length into the
//! width, overlap and threshold of the buckets that pattern cycles through.
//! The threshold follows the q-gram lemma: a pattern of length `n` matched
//! with `e` errors shares at least `n + 1 - Q * (e + 1)` q-grams with the
//! haystack. The overlap makes two neighbouring buckets share the `overlap`
//! diagonals an indel can drift over, so a true match straddling a bucket
//! border is always counted in full by one of them.

use crate::error::{Result, SwiftError};
use crate::swift_opt::{BucketGeometry, MatchMode, SwiftOpt};

/// Derived geometry of one pattern's ring of buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketParams {
    /// Index of this pattern's first bucket in the shared arena
    pub first_bucket: usize,
    /// Ring size minus one; ring size is a power of two
    pub reuse_mask: usize,
    /// Haystack distance after which a bucket's evidence is stale
    pub distance_cut: i64,
    /// Bucket width along the diagonal axis, `1 << log_delta`
    pub delta: i64,
    /// Minimal q-gram count of a reported window
    pub threshold: u16,
    /// Diagonals shared with the previous bucket
    pub overlap: i64,
    pub log_delta: u32,
}

impl BucketParams {
    /// Derive the bucket geometry for a pattern of length `pattern_len`.
    ///
    /// `first_bucket` is left at 0; the store assigns it when it lays out
    /// the arena.
    pub fn derive(opt: &SwiftOpt, pattern_len: usize) -> Result<Self> {
        let q = opt.qgram_len;
        if pattern_len < q {
            return Err(SwiftError::PatternTooShort {
                pattern_id: 0,
                len: pattern_len,
                qgram_len: q,
            });
        }

        let params = match opt.match_mode {
            MatchMode::SemiGlobal => derive_semi_global(opt, pattern_len),
            MatchMode::Local => {
                let min_len = opt.min_match_length.ok_or(SwiftError::MissingMinLength)?;
                derive_local(opt, pattern_len, min_len)
            }
        };

        let span = params.ring_span();
        if params.distance_cut > span {
            log::error!(
                "Bucket geometry for length {} is inconsistent: distance_cut={} > ring span={}",
                pattern_len,
                params.distance_cut,
                span
            );
            return Err(SwiftError::InconsistentGeometry {
                len: pattern_len,
                distance_cut: params.distance_cut,
                span,
            });
        }

        Ok(params)
    }

    /// Number of bucket slots this pattern cycles through.
    #[inline]
    pub fn ring_size(&self) -> usize {
        self.reuse_mask + 1
    }

    /// Diagonals covered by one full turn of the ring.
    #[inline]
    pub fn ring_span(&self) -> i64 {
        (self.ring_size() as i64) << self.log_delta
    }
}

fn ceil_log2(x: usize) -> u32 {
    if x <= 1 {
        0
    } else {
        usize::BITS - (x - 1).leading_zeros()
    }
}

fn threshold_from_lemma(opt: &SwiftOpt, len: usize, errors: usize) -> u16 {
    // q-gram lemma: each error destroys at most Q q-grams
    let conserved = len as i64 + 1 - opt.qgram_len as i64 * (errors as i64 + 1);
    clamp_threshold(opt, conserved)
}

fn clamp_threshold(opt: &SwiftOpt, conserved: i64) -> u16 {
    conserved.clamp(opt.min_threshold as i64, u16::MAX as i64) as u16
}

/// Bucket width, overlap and ring size from the indel budget `errors`.
fn lay_out(opt: &SwiftOpt, pattern_len: usize, errors: usize) -> (i64, u32, usize) {
    let q = opt.qgram_len;
    match opt.geometry {
        BucketGeometry::Diagonal => {
            let overlap = errors;
            let log_delta = ceil_log2(errors + 1).max(opt.min_log2_delta);
            let delta = 1usize << log_delta;
            // worst case: (height-(q-1) - 1 - (delta+1-e))/delta + 3
            // full parallelograms in the middle, 2 at the bottom, 1 at the top
            let buckets_per_col = (pattern_len - q + 2 * delta + errors - 1) / delta;
            (overlap as i64, log_delta, buckets_per_col.next_power_of_two())
        }
        BucketGeometry::Rectangular => {
            let overlap = pattern_len - q + errors;
            let log_delta = ceil_log2(pattern_len - q + 1 + errors).max(opt.min_log2_delta);
            (overlap as i64, log_delta, 2)
        }
    }
}

fn derive_semi_global(opt: &SwiftOpt, pattern_len: usize) -> BucketParams {
    let q = opt.qgram_len;
    let mut errors = opt.max_errors(pattern_len);

    let lemma_errors = if opt.hamming_only {
        errors
    } else {
        errors / (1 + opt.qgram_errors)
    };
    let threshold = threshold_from_lemma(opt, pattern_len, lemma_errors);

    // without indels a match never leaves its diagonal
    if opt.hamming_only {
        errors = 0;
    }

    let (overlap, log_delta, buckets_per_col2) = lay_out(opt, pattern_len, errors);

    BucketParams {
        first_bucket: 0,
        reuse_mask: buckets_per_col2 - 1,
        distance_cut: (pattern_len - (q - 1) + errors) as i64,
        delta: 1i64 << log_delta,
        threshold,
        overlap,
        log_delta,
    }
}

fn derive_local(opt: &SwiftOpt, pattern_len: usize, min_len: usize) -> BucketParams {
    let eps = opt.error_rate;
    let span = opt.qgram_len as f64;

    // n1 is the next length that could decrease the threshold; one global
    // threshold has to hold for every admissible match length
    let n1 = (((eps * min_len as f64).floor() + 1.0) / eps).ceil();
    let t1 = (n1 + 1.0) - span * ((eps * n1).floor() + 1.0);
    let t0 = (min_len as f64 + 1.0) - span * ((eps * min_len as f64).floor() + 1.0);
    let threshold = clamp_threshold(opt, t1.min(t0) as i64);

    let errors = ((2.0 * threshold as f64 + span - 3.0) / (1.0 / eps - span)).floor() as usize;

    // a bucket has distance_cut different q-gram positions; a q-gram this
    // far or further away cannot belong to the same epsilon-match
    let distance_cut =
        (threshold as i64 - 1) + opt.qgram_len as i64 * errors as i64 + opt.qgram_len as i64;

    let (overlap, log_delta, buckets_per_col2) = lay_out(opt, pattern_len, errors);

    // distance_cut follows the minimal match length, not the pattern length;
    // patterns close to that length need a longer ring to keep a band alive
    // until its evidence goes stale
    let stale_after = (distance_cut as usize).div_ceil(1usize << log_delta);
    let ring_size = buckets_per_col2.max(stale_after).next_power_of_two();

    BucketParams {
        first_bucket: 0,
        reuse_mask: ring_size - 1,
        distance_cut,
        delta: 1i64 << log_delta,
        threshold,
        overlap,
        log_delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceil_log2() {
        assert_eq!(ceil_log2(0), 0);
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(16), 4);
        assert_eq!(ceil_log2(17), 5);
    }

    #[test]
    fn test_semi_global_concrete_params() {
        // n=10, Q=4, eps=0.1 => e=1, threshold = 10+1-4*2 = 3
        let opt = SwiftOpt::semi_global(0.1, 4);
        let p = BucketParams::derive(&opt, 10).unwrap();
        assert_eq!(p.threshold, 3);
        assert_eq!(p.overlap, 1);
        assert_eq!(p.log_delta, 4);
        assert_eq!(p.delta, 16);
        assert_eq!(p.distance_cut, 8);
        // (10-4+32+1-1)/16 = 2 buckets per column
        assert_eq!(p.reuse_mask, 1);
        assert!(p.distance_cut <= p.ring_span());
    }

    #[test]
    fn test_zero_errors_still_gets_minimal_delta() {
        let opt = SwiftOpt::semi_global(0.1, 4);
        let p = BucketParams::derive(&opt, 9).unwrap();
        assert_eq!(opt.max_errors(9), 0);
        assert_eq!(p.overlap, 0);
        assert_eq!(p.delta, 16);
        assert_eq!(p.threshold, 6);
    }

    #[test]
    fn test_short_pattern_clamps_threshold() {
        // n=8, Q=3, eps=0.25 => e=2, lemma gives 9-9 = 0
        let opt = SwiftOpt::semi_global(0.25, 3);
        let p = BucketParams::derive(&opt, 8).unwrap();
        assert_eq!(p.threshold, 1);
        let opt = SwiftOpt {
            min_threshold: 2,
            ..SwiftOpt::semi_global(0.25, 3)
        };
        assert_eq!(BucketParams::derive(&opt, 8).unwrap().threshold, 2);
    }

    #[test]
    fn test_large_error_budget_widens_buckets() {
        // 200 * 0.2 = 40 errors => log2(41) rounds up to 6
        let opt = SwiftOpt::semi_global(0.2, 4);
        let p = BucketParams::derive(&opt, 200).unwrap();
        assert_eq!(p.overlap, 40);
        assert_eq!(p.log_delta, 6);
        assert_eq!(p.delta, 64);
        assert!(p.ring_size().is_power_of_two());
        assert!(p.distance_cut <= p.ring_span());
    }

    #[test]
    fn test_hamming_only_has_no_overlap() {
        let opt = SwiftOpt::semi_global(0.1, 4).with_hamming_only(true);
        let p = BucketParams::derive(&opt, 30).unwrap();
        assert_eq!(p.overlap, 0);
        // threshold still accounts for the 3 mismatches
        assert_eq!(p.threshold, 31 - 16);
        assert_eq!(p.distance_cut, 27);
    }

    #[test]
    fn test_qgram_errors_relax_lemma() {
        let opt = SwiftOpt {
            qgram_errors: 1,
            ..SwiftOpt::semi_global(0.1, 4)
        };
        let p = BucketParams::derive(&opt, 40).unwrap();
        // 4 errors, 2 of them count against the lemma
        assert_eq!(p.threshold, 41 - 4 * 3);
        assert_eq!(p.overlap, 4);
    }

    #[test]
    fn test_rectangular_geometry() {
        let opt = SwiftOpt::semi_global(0.1, 4).with_geometry(BucketGeometry::Rectangular);
        let p = BucketParams::derive(&opt, 30).unwrap();
        // overlap = n - Q + e = 29, delta >= n - Q + 1 + e = 30
        assert_eq!(p.overlap, 29);
        assert_eq!(p.delta, 32);
        assert_eq!(p.reuse_mask, 1);
        assert!(p.distance_cut <= p.ring_span());
    }

    #[test]
    fn test_local_threshold_for_min_length() {
        // n0=6: n1 = ceil(1/0.1) = 10; min(11-8, 7-4) = 3
        let opt = SwiftOpt::local(0.1, 4, 6);
        let p = BucketParams::derive(&opt, 43).unwrap();
        assert_eq!(p.threshold, 3);
        // errors = floor((6+4-3)/(10-4)) = 1
        assert_eq!(p.overlap, 1);
        assert_eq!(p.distance_cut, 2 + 4 + 4);
        // (43-4+32+1-1)/16 = 4
        assert_eq!(p.reuse_mask, 3);
    }

    #[test]
    fn test_local_threshold_takes_minimum_over_lengths() {
        // n0=10: n1 = ceil(2/0.1) = 20; min(21-12, 11-8) = 3
        let opt = SwiftOpt::local(0.1, 4, 10);
        let p = BucketParams::derive(&opt, 44).unwrap();
        assert_eq!(p.threshold, 3);
    }

    #[test]
    fn test_local_pattern_at_min_length() {
        // distance_cut = 34 + 11*8 + 11 = 133 needs 9 buckets of 16
        let opt = SwiftOpt::local(0.05, 11, 100);
        for len in [100, 110, 116, 117] {
            let p = BucketParams::derive(&opt, len).unwrap();
            assert_eq!(p.threshold, 35);
            assert_eq!(p.distance_cut, 133);
            assert_eq!(p.ring_size(), 16);
            assert!(p.distance_cut <= p.ring_span());
        }

        let p = BucketParams::derive(&SwiftOpt::local(0.05, 11, 50), 50).unwrap();
        assert_eq!(p.distance_cut, 71);
        assert_eq!(p.ring_size(), 8);
    }

    #[test]
    fn test_pattern_shorter_than_qgram() {
        let opt = SwiftOpt::semi_global(0.1, 4);
        assert!(matches!(
            BucketParams::derive(&opt, 3),
            Err(SwiftError::PatternTooShort { len: 3, .. })
        ));
    }
}
