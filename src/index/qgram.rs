// In-memory q-gram index for DNA patterns
//
// Bases are packed 2 bits each (A=0, C=1, G=2, T/U=3), so a q-gram of up to
// 32 bases is its own hash. Any other character (N, IUPAC codes, gaps) breaks
// the q-gram: the hasher restarts and no q-gram containing it is indexed.

use std::collections::HashMap;

use super::{Occurrence, QGramHasher, QGramIndex};
use crate::defaults::MAX_QGRAM_LEN;
use crate::error::{Result, SwiftError};

/// Function to convert a base character to its 2-bit code
/// Case-insensitive: A/a -> 0, C/c -> 1, G/g -> 2, T/t/U/u -> 3, other -> None
#[inline(always)]
pub fn base_to_code(base: u8) -> Option<u64> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' | b'U' | b'u' => Some(3),
        _ => None,
    }
}

/// Rolling 2-bit hash of the last `qgram_len` bases.
#[derive(Debug, Clone)]
pub struct DnaQGramHasher {
    qgram_len: usize,
    mask: u64,
    value: u64,
    filled: usize,
}

impl DnaQGramHasher {
    pub fn new(qgram_len: usize) -> Self {
        assert!(
            (1..=MAX_QGRAM_LEN).contains(&qgram_len),
            "q-gram length {} outside 1..={}",
            qgram_len,
            MAX_QGRAM_LEN
        );
        let mask = if qgram_len == MAX_QGRAM_LEN {
            u64::MAX
        } else {
            (1u64 << (2 * qgram_len)) - 1
        };
        DnaQGramHasher {
            qgram_len,
            mask,
            value: 0,
            filled: 0,
        }
    }

    /// Hash of a complete q-gram, or `None` if it contains a non-ACGT base.
    pub fn hash(qgram: &[u8]) -> Option<u64> {
        qgram
            .iter()
            .try_fold(0u64, |acc, &b| base_to_code(b).map(|c| (acc << 2) | c))
    }
}

impl QGramHasher for DnaQGramHasher {
    #[inline]
    fn qgram_len(&self) -> usize {
        self.qgram_len
    }

    #[inline]
    fn reset(&mut self) {
        self.value = 0;
        self.filled = 0;
    }

    #[inline]
    fn push(&mut self, base: u8) -> Option<u64> {
        match base_to_code(base) {
            Some(code) => {
                self.value = ((self.value << 2) | code) & self.mask;
                if self.filled < self.qgram_len {
                    self.filled += 1;
                }
                (self.filled == self.qgram_len).then_some(self.value)
            }
            None => {
                self.reset();
                None
            }
        }
    }
}

/// Hash table from q-gram to all its occurrences in a pattern set.
#[derive(Debug, Clone)]
pub struct DnaQGramIndex {
    qgram_len: usize,
    lengths: Vec<usize>,
    table: HashMap<u64, Vec<Occurrence>>,
}

impl DnaQGramIndex {
    /// Index every ACGT q-gram of every pattern.
    ///
    /// Pattern ids are positions in `patterns`.
    pub fn new<S: AsRef<[u8]>>(patterns: &[S], qgram_len: usize) -> Result<Self> {
        if qgram_len == 0 || qgram_len > MAX_QGRAM_LEN {
            return Err(SwiftError::InvalidQGramLength {
                got: qgram_len,
                max: MAX_QGRAM_LEN,
            });
        }
        if patterns.is_empty() {
            return Err(SwiftError::EmptyPatternSet);
        }
        if patterns.len() > u32::MAX as usize {
            return Err(SwiftError::InvalidOption(format!(
                "too many patterns: {}",
                patterns.len()
            )));
        }

        let mut table: HashMap<u64, Vec<Occurrence>> = HashMap::new();
        let mut lengths = Vec::with_capacity(patterns.len());
        let mut hasher = DnaQGramHasher::new(qgram_len);

        for (pattern_id, pattern) in patterns.iter().enumerate() {
            let seq = pattern.as_ref();
            if seq.len() > u32::MAX as usize {
                return Err(SwiftError::InvalidOption(format!(
                    "pattern {} is too long: {} bases",
                    pattern_id,
                    seq.len()
                )));
            }
            lengths.push(seq.len());

            hasher.reset();
            for (i, &base) in seq.iter().enumerate() {
                if let Some(hash) = hasher.push(base) {
                    table.entry(hash).or_default().push(Occurrence {
                        pattern_id: pattern_id as u32,
                        offset: (i + 1 - qgram_len) as u32,
                    });
                }
            }
        }

        log::debug!(
            "Indexed {} patterns: {} distinct {}-grams",
            lengths.len(),
            table.len(),
            qgram_len
        );

        Ok(DnaQGramIndex {
            qgram_len,
            lengths,
            table,
        })
    }

    pub fn pattern_count(&self) -> usize {
        self.lengths.len()
    }

    /// Number of distinct q-grams in the index.
    pub fn distinct_qgrams(&self) -> usize {
        self.table.len()
    }
}

impl QGramIndex for DnaQGramIndex {
    type Hasher = DnaQGramHasher;

    #[inline]
    fn qgram_len(&self) -> usize {
        self.qgram_len
    }

    #[inline]
    fn pattern_lengths(&self) -> &[usize] {
        &self.lengths
    }

    #[inline]
    fn lookup(&self, hash: u64) -> &[Occurrence] {
        self.table.get(&hash).map_or(&[], Vec::as_slice)
    }

    fn hasher(&self) -> DnaQGramHasher {
        DnaQGramHasher::new(self.qgram_len)
    }
}
