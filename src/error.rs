use thiserror::Error;

/// Errors raised while configuring the filter or reading its inputs.
///
/// Every configuration problem is detected before the first haystack
/// position is scanned; streaming itself never fails.
#[derive(Debug, Error)]
pub enum SwiftError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("error rate must be in (0, 0.25], got {0}")]
    InvalidErrorRate(f64),

    #[error("q-gram length must be in [1, {max}], got {got}")]
    InvalidQGramLength { got: usize, max: usize },

    #[error("q-gram length {qgram_len} must be smaller than 1/error_rate = {limit:.2}")]
    QGramTooLongForErrorRate { qgram_len: usize, limit: f64 },

    #[error("pattern {pattern_id} has length {len}, shorter than the q-gram length {qgram_len}")]
    PatternTooShort {
        pattern_id: usize,
        len: usize,
        qgram_len: usize,
    },

    #[error("local matching needs a minimum match length of at least the q-gram length")]
    MissingMinLength,

    #[error("pattern set is empty")]
    EmptyPatternSet,

    #[error(
        "inconsistent bucket geometry for pattern length {len}: distance cut {distance_cut} exceeds {span} ring positions"
    )]
    InconsistentGeometry {
        len: usize,
        distance_cut: i64,
        span: i64,
    },

    #[error("invalid option: {0}")]
    InvalidOption(String),
}

pub type Result<T> = std::result::Result<T, SwiftError>;
