//! Candidate windows and the pull-based queue that hands them out.

use std::iter::FusedIterator;
use std::ops::Range;

use super::driver::SwiftFinder;
use crate::index::QGramIndex;

/// A haystack window that may contain an approximate occurrence of a pattern.
///
/// Hits are candidates only. Windows are deliberately wider than any true
/// match they stand for, and false positives are expected; an exact
/// verification step has to confirm or discard each one.
///
/// One match can close several neighbouring buckets. A window that lies
/// inside the previous window reported for the same pattern is not handed
/// out again, but windows that only partly overlap are all reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hit {
    /// Window start in the haystack (inclusive, never negative)
    pub haystack_start: usize,
    /// Window end in the haystack (exclusive)
    pub haystack_end: usize,
    pub pattern_id: usize,
    /// Start of the pattern region involved (0 for semi-global hits)
    pub needle_start: usize,
    /// End of the pattern region involved (pattern length for semi-global hits)
    pub needle_end: usize,
    /// Q-gram credits the bucket had collected when it was reported
    pub qgram_count: u16,
}

impl Hit {
    #[inline]
    pub fn haystack_range(&self) -> Range<usize> {
        self.haystack_start..self.haystack_end
    }

    #[inline]
    pub fn needle_range(&self) -> Range<usize> {
        self.needle_start..self.needle_end
    }

    /// Window length in the haystack.
    #[inline]
    pub fn len(&self) -> usize {
        self.haystack_end - self.haystack_start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.haystack_end == self.haystack_start
    }

    /// Whether the window covers all of `range`.
    pub fn covers(&self, range: &Range<usize>) -> bool {
        self.haystack_start <= range.start && range.end <= self.haystack_end
    }

    /// Whether `other` names the same pattern and lies inside this hit, in
    /// the haystack as well as in the pattern.
    pub fn contains_window(&self, other: &Hit) -> bool {
        self.pattern_id == other.pattern_id
            && self.covers(&other.haystack_range())
            && self.needle_start <= other.needle_start
            && other.needle_end <= self.needle_end
    }

    /// Clip the window end to the haystack length.
    pub(crate) fn clipped(mut self, haystack_len: usize) -> Self {
        self.haystack_end = self.haystack_end.min(haystack_len);
        self.haystack_start = self.haystack_start.min(self.haystack_end);
        self
    }
}

/// Forward-only stream of hits for one haystack.
///
/// Hits are produced lazily as the finder advances; the queue owns the
/// finder, so a pass can be consumed at most once. Dropping the queue early
/// cancels the scan.
pub struct HitQueue<'a, I: QGramIndex> {
    finder: SwiftFinder<'a, I>,
}

impl<'a, I: QGramIndex> HitQueue<'a, I> {
    pub(crate) fn new(finder: SwiftFinder<'a, I>) -> Self {
        HitQueue { finder }
    }

    /// The finder driving this queue, for its scan statistics.
    pub fn finder(&self) -> &SwiftFinder<'a, I> {
        &self.finder
    }
}

impl<I: QGramIndex> Iterator for HitQueue<'_, I> {
    type Item = Hit;

    #[inline]
    fn next(&mut self) -> Option<Hit> {
        self.finder.next_hit()
    }
}

impl<I: QGramIndex> FusedIterator for HitQueue<'_, I> {}
