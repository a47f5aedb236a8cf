//! Q-gram index over a pattern set.
//!
//! The filter only consumes two collaborators: a rolling hasher that yields
//! the hash of the q-gram ending at each haystack position, and an index that
//! maps such a hash to every place the same q-gram occurs in the patterns.
//! [`DnaQGramIndex`] is the in-memory implementation used by the binary.

pub mod qgram;
pub mod repeats;

pub use qgram::{DnaQGramHasher, DnaQGramIndex};
pub use repeats::{find_repeats, unmasked_ranges};

/// One occurrence of a q-gram inside the pattern set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Occurrence {
    pub pattern_id: u32,
    /// Start of the q-gram within the pattern
    pub offset: u32,
}

/// Rolling hash over a stream of bases.
pub trait QGramHasher {
    fn qgram_len(&self) -> usize;

    /// Forget every base pushed so far.
    fn reset(&mut self);

    /// Push the next base. Returns the hash of the q-gram ending at this base
    /// once `qgram_len` hashable bases have been seen since the last reset.
    fn push(&mut self, base: u8) -> Option<u64>;
}

/// Lookup table from q-gram hash to pattern occurrences.
///
/// Must not change while a haystack is being filtered.
pub trait QGramIndex {
    type Hasher: QGramHasher;

    fn qgram_len(&self) -> usize;

    /// Length of every pattern, indexed by pattern id.
    fn pattern_lengths(&self) -> &[usize];

    /// Every occurrence of the q-gram with hash `hash`, ordered by pattern id
    /// and then offset.
    fn lookup(&self, hash: u64) -> &[Occurrence];

    /// A fresh hasher compatible with [`lookup`](Self::lookup).
    fn hasher(&self) -> Self::Hasher;
}
