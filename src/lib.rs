pub mod defaults;
pub mod error;
pub mod filter; // SWIFT bucket filter (parameters, bucket store, streaming driver, hits)
pub mod index; // Q-gram index over the pattern set, repeat detection
pub mod io; // FASTA input, hit output
pub mod pipeline; // Parallel filtering of many haystack records
pub mod swift; // `filter` command entry point
pub mod swift_opt;

pub use error::{Result, SwiftError};
pub use filter::{BucketStore, Hit, HitQueue, SwiftFinder};
pub use index::{DnaQGramIndex, QGramIndex};
pub use swift_opt::{BucketGeometry, MatchMode, SwiftOpt};
