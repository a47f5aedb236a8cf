// src/defaults.rs

// Bucket geometry floors
pub const LOG2DELTA_MIN: u32 = 4;
pub const THRESHOLD_MIN: u16 = 1;
pub const TABOO_LENGTH: i64 = 1;

// Bucket counters are u16 and clamp here instead of wrapping
pub const COUNTER_CLAMP: u16 = u16::MAX;

// Largest q-gram that still packs into a u64 with 2 bits per base
pub const MAX_QGRAM_LEN: usize = 32;

// Filter Constants
pub const ERROR_RATE: f64 = 0.05;
pub const QGRAM_LEN: usize = 11;
pub const QGRAM_ERRORS: usize = 0;

// Repeat masking Constants
pub const REPEAT_MIN_LEN: usize = 1000;
pub const REPEAT_MAX_PERIOD: usize = 1;

// Other Constants
pub const VERBOSITY: i32 = 3;
pub const PROGRESS_INTERVAL: u64 = 1_000_000;
pub const RECORD_BATCH_SIZE: usize = 64; // Haystack records filtered per parallel batch
