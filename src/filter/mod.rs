//! SWIFT q-gram filtration.
//!
//! The haystack is streamed once. Every q-gram it shares with a pattern
//! votes for a diagonal band of that pattern's dot plot; a band that
//! collects enough votes within a short haystack distance becomes a
//! candidate window ([`Hit`]) for exact verification.
//!
//! - [`params`]: bucket geometry and thresholds from the error rate
//! - [`bucket`]: per-band counters
//! - [`store`]: the bucket arena and its update/flush state machine
//! - [`driver`]: the streaming loop
//! - [`hits`]: candidate windows and the iterator handing them out

pub mod bucket;
pub mod driver;
pub mod hits;
pub mod params;
pub mod store;

pub use bucket::{Bucket, SaturatingCounter};
pub use driver::{ScanStats, SwiftFinder};
pub use hits::{Hit, HitQueue};
pub use params::BucketParams;
pub use store::BucketStore;
