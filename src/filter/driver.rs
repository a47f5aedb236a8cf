//! Haystack streaming.
//!
//! [`SwiftFinder`] walks the haystack once, left to right. At every position
//! it rolls the q-gram hash forward, looks the q-gram up in the index and
//! credits the bucket of every occurrence's diagonal. Hits come out as
//! buckets close; the remainder is flushed when the haystack is exhausted.
//!
//! Two ways to drive a finder:
//! - pull hits one at a time with [`SwiftFinder::next_hit`] or through the
//!   [`HitQueue`] iterator from [`SwiftFinder::into_hits`];
//! - scan fixed-size windows with [`SwiftFinder::scan_window`] and end with
//!   [`SwiftFinder::finish`].

use std::collections::VecDeque;
use std::ops::Range;

use super::hits::{Hit, HitQueue};
use super::store::BucketStore;
use crate::defaults::PROGRESS_INTERVAL;
use crate::error::{Result, SwiftError};
use crate::index::{QGramHasher, QGramIndex, find_repeats, unmasked_ranges};
use crate::swift_opt::{BucketGeometry, SwiftOpt};

/// Counters collected while scanning one haystack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Haystack positions pushed through the hasher
    pub positions: u64,
    /// Positions skipped as repeats
    pub masked: u64,
    /// Complete q-grams looked up in the index
    pub lookups: u64,
    /// Pattern occurrences credited to buckets
    pub occurrences: u64,
    /// Hits handed out so far
    pub hits: u64,
    /// Hits dropped because their clipped window lay inside the previous
    /// hit of the same pattern
    pub duplicates: u64,
}

/// Single-pass q-gram filter over one haystack sequence.
pub struct SwiftFinder<'a, I: QGramIndex> {
    index: &'a I,
    store: BucketStore,
    haystack: &'a [u8],
    hasher: I::Hasher,
    geometry: BucketGeometry,
    qgram_len: usize,
    ranges: Vec<Range<usize>>,
    range_idx: usize,
    cursor: usize,
    pending: VecDeque<Hit>,
    last_hits: Vec<Option<Hit>>,
    flushed: bool,
    stats: ScanStats,
}

impl<'a, I: QGramIndex> SwiftFinder<'a, I> {
    /// Set up a filter pass of `haystack` against every pattern in `index`.
    ///
    /// Fails if `opt` is inconsistent or does not fit the index.
    pub fn new(index: &'a I, haystack: &'a [u8], opt: &SwiftOpt) -> Result<Self> {
        let store = BucketStore::new(index.pattern_lengths(), opt)?;
        Self::with_store(index, haystack, store, opt)
    }

    /// Like [`new`](Self::new) but reuses a store left over from a previous
    /// haystack (see [`into_store`](Self::into_store)).
    ///
    /// The store must have been flushed.
    pub fn with_store(
        index: &'a I,
        haystack: &'a [u8],
        store: BucketStore,
        opt: &SwiftOpt,
    ) -> Result<Self> {
        opt.check()?;
        if index.qgram_len() != opt.qgram_len {
            return Err(SwiftError::InvalidOption(format!(
                "index was built for {}-grams but the filter uses {}-grams",
                index.qgram_len(),
                opt.qgram_len
            )));
        }
        if store.pattern_count() != index.pattern_lengths().len() {
            return Err(SwiftError::InvalidOption(format!(
                "bucket store holds {} patterns but the index holds {}",
                store.pattern_count(),
                index.pattern_lengths().len()
            )));
        }
        if !store.is_reset() {
            return Err(SwiftError::InvalidOption(
                "bucket store must be flushed before it is reused".to_string(),
            ));
        }

        let ranges = match &opt.repeat_mask {
            Some(mask) => {
                let repeats = find_repeats(haystack, mask.min_len, mask.max_period);
                if !repeats.is_empty() {
                    log::debug!(
                        "Masking {} repeat regions ({} bases)",
                        repeats.len(),
                        repeats.iter().map(|r| r.len()).sum::<usize>()
                    );
                }
                unmasked_ranges(&repeats, haystack.len())
            }
            None if haystack.is_empty() => Vec::new(),
            None => vec![0..haystack.len()],
        };

        let patterns = store.pattern_count();
        let scanned: usize = ranges.iter().map(|r| r.len()).sum();
        let cursor = ranges.first().map_or(0, |r| r.start);

        Ok(SwiftFinder {
            index,
            store,
            haystack,
            hasher: index.hasher(),
            geometry: opt.geometry,
            qgram_len: index.qgram_len(),
            ranges,
            range_idx: 0,
            cursor,
            pending: VecDeque::new(),
            last_hits: vec![None; patterns],
            flushed: false,
            stats: ScanStats {
                masked: (haystack.len() - scanned) as u64,
                ..Default::default()
            },
        })
    }

    /// Pull the next hit, scanning as far as needed to produce one.
    ///
    /// Returns `None` once the haystack is exhausted and every remaining
    /// bucket has been flushed.
    pub fn next_hit(&mut self) -> Option<Hit> {
        loop {
            if let Some(hit) = self.pending.pop_front() {
                match self.accept(hit) {
                    Some(hit) => return Some(hit),
                    None => continue,
                }
            }
            if self.flushed {
                return None;
            }
            if !self.advance() {
                self.flush();
            }
        }
    }

    /// Turn the finder into a forward-only hit iterator.
    pub fn into_hits(self) -> HitQueue<'a, I> {
        HitQueue::new(self)
    }

    /// Scan up to `len` more haystack positions and return the hits closed
    /// within them.
    pub fn scan_window(&mut self, len: usize) -> Vec<Hit> {
        for _ in 0..len {
            if !self.advance() {
                break;
            }
        }
        self.drain_pending()
    }

    /// Scan whatever is left of the haystack, flush every bucket and return
    /// the resulting hits. Later calls return nothing.
    pub fn finish(&mut self) -> Vec<Hit> {
        while self.advance() {}
        self.flush();
        self.drain_pending()
    }

    /// Whether every haystack position has been scanned.
    pub fn at_end(&self) -> bool {
        self.ranges[self.range_idx..]
            .iter()
            .all(|r| self.cursor >= r.end)
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn store(&self) -> &BucketStore {
        &self.store
    }

    /// Release the bucket store for the next haystack. Finishes the scan
    /// first; hits produced by that are dropped.
    pub fn into_store(mut self) -> BucketStore {
        if !self.flushed {
            let dropped = self.finish().len();
            if dropped > 0 {
                log::warn!("Dropped {} unread hits while releasing the bucket store", dropped);
            }
        }
        self.store
    }

    fn drain_pending(&mut self) -> Vec<Hit> {
        let mut hits = Vec::with_capacity(self.pending.len());
        while let Some(hit) = self.pending.pop_front() {
            hits.extend(self.accept(hit));
        }
        hits
    }

    /// Clip a closed window to the haystack. Neighbouring buckets that share
    /// an overlap diagonal can close with windows that clip into the one
    /// just handed out; those are dropped.
    fn accept(&mut self, hit: Hit) -> Option<Hit> {
        let hit = hit.clipped(self.haystack.len());
        let last = &mut self.last_hits[hit.pattern_id];
        if last.is_some_and(|prev| prev.contains_window(&hit)) {
            self.stats.duplicates += 1;
            return None;
        }
        *last = Some(hit);
        self.stats.hits += 1;
        Some(hit)
    }

    /// Process one haystack position. Returns false when none is left.
    fn advance(&mut self) -> bool {
        while let Some(range) = self.ranges.get(self.range_idx) {
            if self.cursor < range.end {
                self.step();
                return true;
            }
            // q-grams never span a masked region
            self.range_idx += 1;
            self.hasher.reset();
            if let Some(next) = self.ranges.get(self.range_idx) {
                self.cursor = self.cursor.max(next.start);
            }
        }
        false
    }

    fn step(&mut self) {
        let base = self.haystack[self.cursor];
        self.cursor += 1;
        self.stats.positions += 1;

        if let Some(hash) = self.hasher.push(base) {
            let pos = (self.cursor - self.qgram_len) as i64;
            let index = self.index;
            let occurrences = index.lookup(hash);
            self.stats.lookups += 1;
            self.stats.occurrences += occurrences.len() as u64;

            for occ in occurrences {
                let pattern_id = occ.pattern_id as usize;
                assert!(
                    pattern_id < self.store.pattern_count(),
                    "q-gram index reported pattern {} but only {} patterns are registered",
                    pattern_id,
                    self.store.pattern_count()
                );
                let offset = occ.offset as usize;
                assert!(
                    offset + self.qgram_len <= self.store.pattern_len(pattern_id),
                    "q-gram index reported offset {} in pattern {} of length {}",
                    offset,
                    pattern_id,
                    self.store.pattern_len(pattern_id)
                );

                let diagonal = match self.geometry {
                    BucketGeometry::Diagonal => pos - offset as i64,
                    BucketGeometry::Rectangular => pos,
                };
                self.store
                    .register(pattern_id, diagonal, pos, &mut self.pending);
            }
        }

        if self.stats.positions % PROGRESS_INTERVAL == 0 {
            log::debug!(
                "Scanned {} positions: {} lookups, {} hits so far",
                self.stats.positions,
                self.stats.lookups,
                self.stats.hits + self.pending.len() as u64
            );
        }
    }

    fn flush(&mut self) {
        if self.flushed {
            return;
        }
        let hits = self.store.flush_all();
        self.pending.extend(hits);
        self.flushed = true;

        log::info!(
            "Filtered {} positions ({} masked): {} q-gram lookups, {} occurrences, {} hits",
            self.stats.positions,
            self.stats.masked,
            self.stats.lookups,
            self.stats.occurrences,
            self.stats.hits + self.pending.len() as u64
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{DnaQGramIndex, Occurrence};
    use crate::swift_opt::RepeatMask;

    #[test]
    fn test_concrete_scenario() {
        let index = DnaQGramIndex::new(&["ACGTACGTAC"], 4).unwrap();
        let opt = SwiftOpt::semi_global(0.1, 4);
        let finder = SwiftFinder::new(&index, b"ACGTATGTAC", &opt).unwrap();
        let hits: Vec<Hit> = finder.into_hits().collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].pattern_id, 0);
        assert_eq!(hits[0].haystack_range(), 0..10);
        assert_eq!(hits[0].needle_range(), 0..10);
        assert_eq!(hits[0].qgram_count, 3);
    }

    #[test]
    fn test_window_inside_previous_hit_is_dropped() {
        // the band at diagonal 0 reports [0,26); the band below it reaches
        // the threshold on the periodic copies and clips to [0,10)
        let index = DnaQGramIndex::new(&["ACGTACGTAC"], 4).unwrap();
        let opt = SwiftOpt::semi_global(0.1, 4);
        let haystack = format!("TTACGTACGTAC{}", "T".repeat(24));
        let mut queue = SwiftFinder::new(&index, haystack.as_bytes(), &opt)
            .unwrap()
            .into_hits();
        let hits: Vec<Hit> = queue.by_ref().collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].haystack_range(), 0..26);
        assert_eq!(hits[0].qgram_count, 7);
        assert_eq!(queue.finder().stats().hits, 1);
        assert_eq!(queue.finder().stats().duplicates, 1);
    }

    #[test]
    fn test_no_shared_qgrams_no_hits() {
        let index = DnaQGramIndex::new(&["ACGTACGTAC"], 4).unwrap();
        let opt = SwiftOpt::semi_global(0.1, 4);
        let mut finder = SwiftFinder::new(&index, b"TTTTTTTTTTTTTTTT", &opt).unwrap();
        assert_eq!(finder.next_hit(), None);
        assert_eq!(finder.next_hit(), None);
        assert_eq!(finder.stats().positions, 16);
        assert_eq!(finder.stats().lookups, 13);
        assert_eq!(finder.stats().occurrences, 0);
    }

    #[test]
    fn test_empty_haystack() {
        let index = DnaQGramIndex::new(&["ACGTACGTAC"], 4).unwrap();
        let opt = SwiftOpt::semi_global(0.1, 4);
        let mut finder = SwiftFinder::new(&index, b"", &opt).unwrap();
        assert!(finder.at_end());
        assert!(finder.finish().is_empty());
    }

    #[test]
    fn test_qgram_length_mismatch_rejected() {
        let index = DnaQGramIndex::new(&["ACGTACGTAC"], 5).unwrap();
        let opt = SwiftOpt::semi_global(0.1, 4);
        assert!(matches!(
            SwiftFinder::new(&index, b"ACGT", &opt),
            Err(SwiftError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_window_scan_matches_pull() {
        let index = DnaQGramIndex::new(&["ACGTACGTAC", "GATTACAGCT"], 4).unwrap();
        let opt = SwiftOpt::semi_global(0.1, 4);
        let haystack = b"TTACGTACGTACTTTTTTTTTTTTTTTTTTTTTTTTGATTACAGCTTTTTTTTTTTTTTTTTTTTTTTTTTTACGTATGTACTT";

        let pulled: Vec<Hit> = SwiftFinder::new(&index, haystack, &opt)
            .unwrap()
            .into_hits()
            .collect();

        let mut finder = SwiftFinder::new(&index, haystack, &opt).unwrap();
        let mut windowed = Vec::new();
        while !finder.at_end() {
            windowed.extend(finder.scan_window(7));
        }
        windowed.extend(finder.finish());
        assert!(finder.finish().is_empty());

        assert!(!pulled.is_empty());
        assert_eq!(pulled, windowed);
        assert_eq!(finder.stats().positions, haystack.len() as u64);
        assert_eq!(finder.stats().hits, windowed.len() as u64);
    }

    #[test]
    fn test_repeat_mask_skips_region() {
        let index = DnaQGramIndex::new(&["AAAAAAAAAA"], 4).unwrap();
        let haystack = [b'A'; 40];
        let opt = SwiftOpt::semi_global(0.1, 4);
        assert!(SwiftFinder::new(&index, &haystack, &opt).unwrap().next_hit().is_some());

        let opt = opt.with_repeat_mask(RepeatMask {
            min_len: 20,
            max_period: 1,
        });
        let mut finder = SwiftFinder::new(&index, &haystack, &opt).unwrap();
        assert!(finder.at_end());
        assert_eq!(finder.next_hit(), None);
        assert_eq!(finder.stats().masked, 40);
        assert_eq!(finder.stats().positions, 0);
    }

    #[test]
    fn test_store_reuse_across_haystacks() {
        let index = DnaQGramIndex::new(&["ACGTACGTAC"], 4).unwrap();
        let opt = SwiftOpt::semi_global(0.1, 4);
        let mut finder = SwiftFinder::new(&index, b"ACGTACGTAC", &opt).unwrap();
        assert_eq!(finder.finish().len(), 1);
        let store = finder.into_store();
        assert!(store.is_reset());

        let finder = SwiftFinder::with_store(&index, b"TTTTTACGTACGTACTTT", store, &opt).unwrap();
        let hits: Vec<Hit> = finder.into_hits().collect();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].covers(&(5..15)));
    }

    struct BrokenIndex {
        lengths: Vec<usize>,
        occ: Vec<Occurrence>,
    }

    impl QGramIndex for BrokenIndex {
        type Hasher = crate::index::DnaQGramHasher;

        fn qgram_len(&self) -> usize {
            4
        }

        fn pattern_lengths(&self) -> &[usize] {
            &self.lengths
        }

        fn lookup(&self, _hash: u64) -> &[Occurrence] {
            &self.occ
        }

        fn hasher(&self) -> Self::Hasher {
            crate::index::DnaQGramHasher::new(4)
        }
    }

    #[test]
    #[should_panic(expected = "patterns are registered")]
    fn test_out_of_range_pattern_panics() {
        let index = BrokenIndex {
            lengths: vec![10],
            occ: vec![Occurrence { pattern_id: 1, offset: 0 }],
        };
        let opt = SwiftOpt::semi_global(0.1, 4);
        let mut finder = SwiftFinder::new(&index, b"ACGTACGT", &opt).unwrap();
        finder.next_hit();
    }

    #[test]
    #[should_panic(expected = "reported offset")]
    fn test_out_of_range_offset_panics() {
        let index = BrokenIndex {
            lengths: vec![10],
            occ: vec![Occurrence { pattern_id: 0, offset: 7 }],
        };
        let opt = SwiftOpt::semi_global(0.1, 4);
        let mut finder = SwiftFinder::new(&index, b"ACGTACGT", &opt).unwrap();
        finder.next_hit();
    }
}
