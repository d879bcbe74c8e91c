// crates/lexicon-core/src/core/time.rs
// ============================================================================
// Module: Lexicon Time Model
// Description: Unix-millisecond timestamps and injectable clocks.
// Purpose: Keep recency bookkeeping deterministic under test.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Stores never read wall-clock time directly. They ask a [`Clock`] supplied
//! at construction, which lets tests pin `last_used` values and drive the
//! cleanup cutoff without sleeping.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Milliseconds since the Unix epoch.
///
/// # Invariants
/// - Ordering matches chronological ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns this timestamp moved back by `age`, saturating at `i64::MIN`.
    #[must_use]
    pub fn saturating_sub(self, age: Duration) -> Self {
        let millis = i64::try_from(age.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_sub(millis))
    }
}

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Timestamp(i64::try_from(now.as_millis()).unwrap_or(i64::MAX))
    }
}

/// Manually advanced clock for deterministic tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Current value in unix milliseconds.
    millis: AtomicI64,
}

impl ManualClock {
    /// Creates a clock fixed at `start`.
    #[must_use]
    pub const fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.0),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: Timestamp) {
        self.millis.store(now.0, Ordering::SeqCst);
    }

    /// Advances the clock by `step` milliseconds and returns the new time.
    pub fn advance_millis(&self, step: i64) -> Timestamp {
        Timestamp(self.millis.fetch_add(step, Ordering::SeqCst).saturating_add(step))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.millis.load(Ordering::SeqCst))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Clock;
    use super::ManualClock;
    use super::Timestamp;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(Timestamp::from_unix_millis(1_000));
        assert_eq!(clock.now().as_unix_millis(), 1_000);
        assert_eq!(clock.advance_millis(500).as_unix_millis(), 1_500);
        assert_eq!(clock.now().as_unix_millis(), 1_500);
    }

    #[test]
    fn saturating_sub_days() {
        let now = Timestamp::from_unix_millis(10 * 86_400_000);
        let cutoff = now.saturating_sub(Duration::from_secs(3 * 86_400));
        assert_eq!(cutoff.as_unix_millis(), 7 * 86_400_000);
        assert_eq!(
            Timestamp::from_unix_millis(i64::MIN + 1).saturating_sub(Duration::from_secs(1)),
            Timestamp::from_unix_millis(i64::MIN)
        );
    }
}
