//! Bucket counters.

use crate::defaults::COUNTER_CLAMP;

/// Q-gram hit counter that sticks at [`COUNTER_CLAMP`] instead of wrapping.
///
/// Clamping is an approximation: a bucket flooded by a repeat-heavy region
/// keeps reporting "at least the clamp" rather than its true count. It only
/// guarantees that an overflow never turns a full bucket into an empty one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SaturatingCounter(u16);

impl SaturatingCounter {
    pub const ZERO: SaturatingCounter = SaturatingCounter(0);
    pub const ONE: SaturatingCounter = SaturatingCounter(1);

    #[inline(always)]
    pub fn get(self) -> u16 {
        self.0
    }

    #[inline(always)]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub fn increment(&mut self) {
        if self.0 < COUNTER_CLAMP {
            self.0 += 1;
        }
    }

    #[inline(always)]
    pub fn is_saturated(self) -> bool {
        self.0 == COUNTER_CLAMP
    }
}

/// Recent q-gram evidence for one diagonal band of one pattern.
///
/// Positions are absolute haystack coordinates of q-gram starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Haystack position of the first credit since the last reset (local mode)
    pub first_increment: i64,
    /// Haystack position of the most recent credit
    pub last_increment: i64,
    pub counter: SaturatingCounter,
}

impl Bucket {
    /// A bucket whose last credit lies `distance_cut` before position 0, so the
    /// first occurrence at any haystack position finds it expired.
    #[inline]
    pub fn reset(distance_cut: i64) -> Self {
        Bucket {
            first_increment: -distance_cut,
            last_increment: -distance_cut,
            counter: SaturatingCounter::ZERO,
        }
    }

    #[inline]
    pub fn is_reset(&self, distance_cut: i64) -> bool {
        *self == Bucket::reset(distance_cut)
    }
}
