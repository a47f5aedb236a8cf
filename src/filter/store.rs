//! Bucket arena and the accumulate/flush state machine.
//!
//! Every pattern owns a ring of `reuse_mask + 1` buckets inside one shared
//! `Vec<Bucket>`. A diagonal `d` maps to ring slot `(d >> log_delta) &
//! reuse_mask`, so diagonal bands a full ring apart share a slot. Once the
//! haystack has moved on, a slot is silently recycled for the next congruent
//! band; memory depends on the pattern set only, never on the haystack.
//!
//! # Update rule
//!
//! For a q-gram occurrence at haystack position `pos` on a diagonal mapped to
//! bucket `B` (band starting at `band_begin`):
//!
//! 1. If `B.last_increment < band_begin` (evidence from an older congruent
//!    band) or `B.last_increment + distance_cut <= pos` (evidence too far
//!    back), the window is closed: report it if `B.counter >= threshold`, then
//!    restart `B` with a single credit at `pos`.
//! 2. Otherwise credit `B` once, unless it was already credited within
//!    `taboo_length` positions.
//!
//! When the diagonal lies in the first `overlap` diagonals of its band the
//! same update is repeated on the previous bucket of the ring (wrapping from
//! slot 0 to slot `reuse_mask`). Only the previous bucket is involved.

use std::collections::HashMap;

use super::bucket::{Bucket, SaturatingCounter};
use super::hits::Hit;
use super::params::BucketParams;
use crate::error::{Result, SwiftError};
use crate::swift_opt::{BucketGeometry, MatchMode, SwiftOpt};

/// Number of patterns whose derived geometry is logged at debug level
const LOGGED_PARAMS: usize = 3;

#[derive(Debug, Clone, Copy)]
struct PatternSlot {
    params: BucketParams,
    len: usize,
}

/// Exclusively owned bucket state for one pattern set.
///
/// Not shared between concurrent scans: every scan needs its own store.
/// Positions passed to [`register`](Self::register) must never decrease
/// until [`flush_all`](Self::flush_all) is called.
#[derive(Debug, Clone)]
pub struct BucketStore {
    buckets: Vec<Bucket>,
    patterns: Vec<PatternSlot>,
    mode: MatchMode,
    geometry: BucketGeometry,
    qgram_len: i64,
    taboo_length: i64,
    last_pos: i64,
}

impl BucketStore {
    /// Derive bucket geometry for every pattern and lay out the arena.
    ///
    /// Patterns of equal length share one derivation.
    pub fn new(pattern_lengths: &[usize], opt: &SwiftOpt) -> Result<Self> {
        opt.check()?;
        if pattern_lengths.is_empty() {
            return Err(SwiftError::EmptyPatternSet);
        }

        let mut by_length: HashMap<usize, BucketParams> = HashMap::new();
        let mut patterns = Vec::with_capacity(pattern_lengths.len());
        let mut count = 0usize;

        for (pattern_id, &len) in pattern_lengths.iter().enumerate() {
            let mut params = match by_length.get(&len) {
                Some(params) => *params,
                None => {
                    let params = BucketParams::derive(opt, len).map_err(|e| match e {
                        SwiftError::PatternTooShort { len, qgram_len, .. } => {
                            SwiftError::PatternTooShort {
                                pattern_id,
                                len,
                                qgram_len,
                            }
                        }
                        other => other,
                    })?;
                    by_length.insert(len, params);
                    params
                }
            };
            params.first_bucket = count;
            count += params.ring_size();

            if pattern_id < LOGGED_PARAMS {
                log::debug!(
                    "Pattern {} (len {}): first_bucket={} reuse_mask={} distance_cut={} delta={} threshold={} overlap={} log_delta={}",
                    pattern_id,
                    len,
                    params.first_bucket,
                    params.reuse_mask,
                    params.distance_cut,
                    params.delta,
                    params.threshold,
                    params.overlap,
                    params.log_delta
                );
            }

            patterns.push(PatternSlot { params, len });
        }

        let mut buckets = Vec::with_capacity(count);
        for slot in &patterns {
            let ring = slot.params.ring_size();
            buckets.extend(std::iter::repeat_n(Bucket::reset(slot.params.distance_cut), ring));
        }

        log::debug!(
            "BucketStore: {} patterns, {} distinct lengths, {} buckets",
            patterns.len(),
            by_length.len(),
            buckets.len()
        );

        Ok(BucketStore {
            buckets,
            patterns,
            mode: opt.match_mode,
            geometry: opt.geometry,
            qgram_len: opt.qgram_len as i64,
            taboo_length: opt.taboo_length,
            last_pos: i64::MIN,
        })
    }

    #[inline]
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    #[inline]
    pub fn pattern_len(&self, pattern_id: usize) -> usize {
        self.patterns[pattern_id].len
    }

    #[inline]
    pub fn params(&self, pattern_id: usize) -> &BucketParams {
        &self.patterns[pattern_id].params
    }

    /// Total number of buckets in the arena.
    #[inline]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// The ring of buckets owned by `pattern_id`.
    pub fn buckets(&self, pattern_id: usize) -> &[Bucket] {
        let params = &self.patterns[pattern_id].params;
        &self.buckets[params.first_bucket..params.first_bucket + params.ring_size()]
    }

    /// Arena index of the primary bucket for `diagonal`.
    #[inline]
    pub fn locate(&self, pattern_id: usize, diagonal: i64) -> usize {
        let params = &self.patterns[pattern_id].params;
        params.first_bucket + (((diagonal >> params.log_delta) as usize) & params.reuse_mask)
    }

    /// Credit one q-gram occurrence of `pattern_id` on `diagonal`, found at
    /// haystack position `pos`.
    ///
    /// Windows closed by this occurrence are appended to `hits`; at most two
    /// (the primary bucket and its overlapping predecessor).
    pub fn register<E: Extend<Hit>>(
        &mut self,
        pattern_id: usize,
        diagonal: i64,
        pos: i64,
        hits: &mut E,
    ) {
        assert!(
            pattern_id < self.patterns.len(),
            "q-gram index reported pattern {} but only {} patterns are registered",
            pattern_id,
            self.patterns.len()
        );
        assert!(
            pos >= self.last_pos,
            "haystack position {} after {}: positions must not decrease",
            pos,
            self.last_pos
        );
        self.last_pos = pos;

        let slot = self.patterns[pattern_id];
        let params = slot.params;

        let mut bkt_no = ((diagonal >> params.log_delta) as usize) & params.reuse_mask;
        let mut bkt_ofs = diagonal & (params.delta - 1);
        let mut band_begin = diagonal & !(params.delta - 1);

        loop {
            self.credit(pattern_id, slot, bkt_no, band_begin, pos, hits);

            if bkt_ofs >= params.overlap {
                break;
            }

            // repeat with the previous overlapping bucket
            band_begin -= params.delta;
            bkt_ofs += params.delta;
            bkt_no = if bkt_no == 0 {
                params.reuse_mask
            } else {
                bkt_no - 1
            };
        }
    }

    fn credit<E: Extend<Hit>>(
        &mut self,
        pattern_id: usize,
        slot: PatternSlot,
        bkt_no: usize,
        band_begin: i64,
        pos: i64,
        hits: &mut E,
    ) {
        let params = &slot.params;
        let idx = params.first_bucket + bkt_no;
        let bucket = self.buckets[idx];

        let stale = match self.mode {
            MatchMode::SemiGlobal => bucket.last_increment + params.distance_cut <= pos,
            // local distance_cut runs to the end of the q-gram
            MatchMode::Local => bucket.last_increment + params.distance_cut < pos + self.qgram_len,
        };
        if bucket.last_increment < band_begin || stale {
            if bucket.counter.get() >= params.threshold {
                hits.extend(Some(self.window_hit(pattern_id, slot, bkt_no, &bucket)));
            }
            self.buckets[idx] = Bucket {
                first_increment: pos,
                last_increment: pos,
                counter: SaturatingCounter::ONE,
            };
            return;
        }

        if bucket.last_increment + self.taboo_length > pos {
            return;
        }

        let bucket = &mut self.buckets[idx];
        bucket.last_increment = pos;
        bucket.counter.increment();
    }

    /// Report every bucket at or above its threshold, then reset all buckets.
    ///
    /// Call exactly once when a haystack sequence is exhausted; afterwards the
    /// store is ready for the next sequence. A second call in a row returns
    /// nothing.
    pub fn flush_all(&mut self) -> Vec<Hit> {
        let mut hits = Vec::new();

        for pattern_id in 0..self.patterns.len() {
            let slot = self.patterns[pattern_id];
            let params = slot.params;
            for bkt_no in 0..params.ring_size() {
                let idx = params.first_bucket + bkt_no;
                let bucket = self.buckets[idx];
                if bucket.counter.get() >= params.threshold {
                    hits.push(self.window_hit(pattern_id, slot, bkt_no, &bucket));
                }
                self.buckets[idx] = Bucket::reset(params.distance_cut);
            }
        }

        self.last_pos = i64::MIN;
        hits
    }

    /// Whether every bucket is in its freshly reset state.
    pub fn is_reset(&self) -> bool {
        self.patterns.iter().all(|slot| {
            let params = &slot.params;
            self.buckets[params.first_bucket..params.first_bucket + params.ring_size()]
                .iter()
                .all(|b| b.is_reset(params.distance_cut))
        })
    }

    /// Window reported for a bucket in ring slot `bkt_no`.
    fn window_hit(&self, pattern_id: usize, slot: PatternSlot, bkt_no: usize, bucket: &Bucket) -> Hit {
        let params = &slot.params;
        let q = self.qgram_len;
        let n = slot.len as i64;

        // the bucket's band is the highest one at or below the band of the
        // last increment whose number is congruent to bkt_no
        let upper = bucket.last_increment >> params.log_delta;
        let band_no = upper - ((upper - bkt_no as i64) & params.reuse_mask as i64);
        let band_begin = band_no << params.log_delta;

        let (start, end, needle) = match (self.mode, self.geometry) {
            (MatchMode::SemiGlobal, BucketGeometry::Diagonal) => {
                let width = n - 1 + params.delta + params.overlap;
                (band_begin, band_begin + width, (0, n))
            }
            (MatchMode::SemiGlobal, BucketGeometry::Rectangular) => {
                let width = params.delta + params.overlap + q - 1;
                (band_begin, band_begin + width, (0, n))
            }
            (MatchMode::Local, geometry) => {
                let width = bucket.last_increment - bucket.first_increment + q;
                let start = bucket.first_increment;
                let end = bucket.last_increment + q;
                let needle = match geometry {
                    BucketGeometry::Diagonal => {
                        let height = width + params.delta + params.overlap;
                        let ndl_begin = end - band_begin - height;
                        (ndl_begin, ndl_begin + height)
                    }
                    BucketGeometry::Rectangular => (0, n),
                };
                (start, end, needle)
            }
        };

        let start = start.max(0);
        let end = end.max(start);
        let ndl_start = needle.0.clamp(0, n);
        let ndl_end = needle.1.clamp(ndl_start, n);

        Hit {
            haystack_start: start as usize,
            haystack_end: end as usize,
            pattern_id,
            needle_start: ndl_start as usize,
            needle_end: ndl_end as usize,
            qgram_count: bucket.counter.get(),
        }
    }
}
