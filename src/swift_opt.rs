use clap::Args;
use std::path::PathBuf;

use crate::defaults;
use crate::error::{Result, SwiftError};

// src/swift_opt.rs
//
// Filter options: what the caller configures before any haystack is scanned.

/// How a pattern has to match to be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The whole pattern must match with at most `floor(error_rate * len)` errors.
    SemiGlobal,
    /// Any substring of at least `min_match_length` may match with the error rate
    /// (epsilon-matches). Buckets also remember their first increment.
    Local,
}

/// Shape of the haystack regions a bucket summarises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketGeometry {
    /// Parallelograms along diagonals (SWIFT). Fully specified default.
    Diagonal,
    /// Overlapping haystack columns (QUASAR). Secondary, kept for comparison runs.
    Rectangular,
}

/// Low-complexity masking of the haystack before filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatMask {
    /// Minimal length of a masked repeat
    pub min_len: usize,
    /// Maximal period of a masked repeat (1 = homopolymer runs)
    pub max_period: usize,
}

impl Default for RepeatMask {
    fn default() -> Self {
        RepeatMask {
            min_len: defaults::REPEAT_MIN_LEN,
            max_period: defaults::REPEAT_MAX_PERIOD,
        }
    }
}

/// Filter options.
#[derive(Debug, Clone)]
pub struct SwiftOpt {
    pub error_rate: f64,   // Maximal error rate epsilon
    pub qgram_len: usize,  // Q, length of the contiguous q-gram shape
    pub match_mode: MatchMode,
    pub geometry: BucketGeometry,
    pub hamming_only: bool, // No indels: buckets need no overlap for diagonal drift
    pub qgram_errors: usize, // Errors tolerated inside one q-gram (0 = exact q-grams)

    /// Shared minimal match length. Required in local mode; in semi-global
    /// mode it is ignored because every pattern is matched in full.
    pub min_match_length: Option<usize>,

    pub min_threshold: u16,  // Lower bound of any bucket threshold
    pub min_log2_delta: u32, // Lower bound of log2(bucket width)
    pub taboo_length: i64,   // Minimal haystack distance between two credits of one bucket

    pub repeat_mask: Option<RepeatMask>,
    pub threads: usize,
    pub verbosity: i32,
}

impl Default for SwiftOpt {
    fn default() -> Self {
        SwiftOpt {
            error_rate: defaults::ERROR_RATE,
            qgram_len: defaults::QGRAM_LEN,
            match_mode: MatchMode::SemiGlobal,
            geometry: BucketGeometry::Diagonal,
            hamming_only: false,
            qgram_errors: defaults::QGRAM_ERRORS,
            min_match_length: None,
            min_threshold: defaults::THRESHOLD_MIN,
            min_log2_delta: defaults::LOG2DELTA_MIN,
            taboo_length: defaults::TABOO_LENGTH,
            repeat_mask: None,
            threads: 1,
            verbosity: defaults::VERBOSITY,
        }
    }
}

impl SwiftOpt {
    /// Semi-global filter (whole patterns) with diagonal buckets.
    pub fn semi_global(error_rate: f64, qgram_len: usize) -> Self {
        SwiftOpt {
            error_rate,
            qgram_len,
            ..Default::default()
        }
    }

    /// Local filter for epsilon-matches of at least `min_match_length` bases.
    pub fn local(error_rate: f64, qgram_len: usize, min_match_length: usize) -> Self {
        SwiftOpt {
            error_rate,
            qgram_len,
            match_mode: MatchMode::Local,
            min_match_length: Some(min_match_length),
            ..Default::default()
        }
    }

    pub fn with_geometry(mut self, geometry: BucketGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_hamming_only(mut self, hamming_only: bool) -> Self {
        self.hamming_only = hamming_only;
        self
    }

    pub fn with_repeat_mask(mut self, mask: RepeatMask) -> Self {
        self.repeat_mask = Some(mask);
        self
    }

    fn problems(&self) -> Vec<SwiftError> {
        let mut problems = Vec::new();

        if !(self.error_rate > 0.0 && self.error_rate <= 0.25) {
            problems.push(SwiftError::InvalidErrorRate(self.error_rate));
        }
        if self.qgram_len == 0 || self.qgram_len > defaults::MAX_QGRAM_LEN {
            problems.push(SwiftError::InvalidQGramLength {
                got: self.qgram_len,
                max: defaults::MAX_QGRAM_LEN,
            });
        }
        if self.error_rate > 0.0 {
            let limit = 1.0 / self.error_rate;
            if self.qgram_len as f64 >= limit {
                problems.push(SwiftError::QGramTooLongForErrorRate {
                    qgram_len: self.qgram_len,
                    limit,
                });
            }
        }
        if self.match_mode == MatchMode::Local {
            match self.min_match_length {
                Some(n0) if n0 >= self.qgram_len => {}
                _ => problems.push(SwiftError::MissingMinLength),
            }
        }
        if self.min_threshold < 1 {
            problems.push(SwiftError::InvalidOption(format!(
                "min_threshold must be >= 1, got {}",
                self.min_threshold
            )));
        }
        if self.min_log2_delta > 24 {
            problems.push(SwiftError::InvalidOption(format!(
                "min_log2_delta must be <= 24, got {}",
                self.min_log2_delta
            )));
        }
        if self.taboo_length < 1 {
            problems.push(SwiftError::InvalidOption(format!(
                "taboo_length must be >= 1, got {}",
                self.taboo_length
            )));
        }
        if let Some(mask) = &self.repeat_mask {
            if mask.min_len < 1 || mask.max_period < 1 {
                problems.push(SwiftError::InvalidOption(format!(
                    "repeat mask needs min_len >= 1 and max_period >= 1, got {} and {}",
                    mask.min_len, mask.max_period
                )));
            }
        }

        problems
    }

    /// Validate options for consistency.
    /// Returns Ok(()) if valid, or Err with a description of every issue.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let errors: Vec<String> = self.problems().iter().map(|e| e.to_string()).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Like [`validate`](Self::validate) but returns the first issue as a typed error.
    pub fn check(&self) -> Result<()> {
        match self.problems().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Errors a semi-global match of a pattern with `len` bases may contain.
    #[inline]
    pub fn max_errors(&self, len: usize) -> usize {
        (self.error_rate * len as f64).floor() as usize
    }
}

#[derive(Debug, Clone, Args)]
pub struct FilterCliOptions {
    /// Pattern (needle) sequences
    #[arg(value_name = "PATTERNS.FA")]
    pub patterns: PathBuf,

    /// Haystack sequences to scan
    #[arg(value_name = "HAYSTACK.FA")]
    pub haystack: PathBuf,

    // ===== Filter Options =====
    /// Maximal error rate
    #[arg(short = 'e', long, value_name = "FLOAT", default_value_t = defaults::ERROR_RATE)]
    pub error_rate: f64,

    /// Q-gram length
    #[arg(short = 'q', long, value_name = "INT", default_value_t = defaults::QGRAM_LEN)]
    pub qgram_len: usize,

    /// Report local epsilon-matches instead of whole-pattern matches
    #[arg(short = 'l', long)]
    pub local: bool,

    /// Minimal length of a local epsilon-match (required with --local)
    #[arg(short = 'm', long, value_name = "INT")]
    pub min_length: Option<usize>,

    /// Mismatches only, no indels
    #[arg(long)]
    pub hamming: bool,

    /// Use rectangular (column) buckets instead of diagonal parallelograms
    #[arg(long)]
    pub rectangular: bool,

    /// Skip haystack repeats of at least INT bases
    #[arg(short = 'r', long, value_name = "INT")]
    pub mask_repeats: Option<usize>,

    /// Maximal period of a masked repeat
    #[arg(long, value_name = "INT", default_value_t = defaults::REPEAT_MAX_PERIOD)]
    pub max_period: usize,

    // ===== I/O Options =====
    /// Output file (default: stdout)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Verbose level: 1=error, 2=warning, 3=message, 4=debug, 5+=trace
    #[arg(short = 'v', long, value_name = "INT", default_value_t = defaults::VERBOSITY)]
    pub verbosity: i32,

    // ===== Processing Options =====
    /// Number of threads (default: all available cores)
    #[arg(short = 't', long, value_name = "INT")]
    pub threads: Option<usize>,
}

impl FilterCliOptions {
    pub fn to_swift_opt(&self) -> SwiftOpt {
        SwiftOpt {
            error_rate: self.error_rate,
            qgram_len: self.qgram_len,
            match_mode: if self.local {
                MatchMode::Local
            } else {
                MatchMode::SemiGlobal
            },
            geometry: if self.rectangular {
                BucketGeometry::Rectangular
            } else {
                BucketGeometry::Diagonal
            },
            hamming_only: self.hamming,
            min_match_length: self.min_length,
            repeat_mask: self.mask_repeats.map(|min_len| RepeatMask {
                min_len,
                max_period: self.max_period,
            }),
            threads: self.threads.unwrap_or(1),
            verbosity: self.verbosity,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        let opt = SwiftOpt::default();
        assert_eq!(opt.min_threshold, 1);
        assert_eq!(opt.min_log2_delta, 4);
        assert_eq!(opt.taboo_length, 1);
        assert!(opt.validate().is_ok());
        assert!(opt.check().is_ok());
    }

    #[test]
    fn test_error_rate_bounds() {
        assert!(SwiftOpt::semi_global(0.0, 4).check().is_err());
        assert!(SwiftOpt::semi_global(0.3, 2).check().is_err());
        assert!(SwiftOpt::semi_global(0.25, 3).check().is_ok());
        assert!(SwiftOpt::semi_global(f64::NAN, 4).check().is_err());
    }

    #[test]
    fn test_qgram_must_be_shorter_than_inverse_error_rate() {
        let err = SwiftOpt::semi_global(0.1, 10).check().unwrap_err();
        assert!(matches!(err, SwiftError::QGramTooLongForErrorRate { qgram_len: 10, .. }));
        assert!(SwiftOpt::semi_global(0.1, 9).check().is_ok());
    }

    #[test]
    fn test_qgram_len_limit() {
        let mut opt = SwiftOpt::semi_global(0.01, 33);
        assert!(matches!(
            opt.check(),
            Err(SwiftError::InvalidQGramLength { got: 33, max: 32 })
        ));
        opt.qgram_len = 0;
        assert!(opt.check().is_err());
    }

    #[test]
    fn test_local_mode_requires_min_length() {
        let mut opt = SwiftOpt::local(0.1, 4, 6);
        assert!(opt.check().is_ok());
        opt.min_match_length = None;
        assert!(matches!(opt.check(), Err(SwiftError::MissingMinLength)));
        opt.min_match_length = Some(3);
        assert!(matches!(opt.check(), Err(SwiftError::MissingMinLength)));
    }

    #[test]
    fn test_validate_collects_all_problems() {
        let opt = SwiftOpt {
            error_rate: 0.5,
            qgram_len: 40,
            taboo_length: 0,
            ..Default::default()
        };
        let errors = opt.validate().unwrap_err();
        assert!(errors.len() >= 3, "got {errors:?}");
    }

    #[test]
    fn test_max_errors() {
        let opt = SwiftOpt::semi_global(0.1, 4);
        assert_eq!(opt.max_errors(10), 1);
        assert_eq!(opt.max_errors(9), 0);
        assert_eq!(opt.max_errors(35), 3);
    }
}
