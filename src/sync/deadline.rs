/*!
 * Deadline Calculator
 *
 * Converts a relative timeout into an absolute deadline once per logical
 * wait, and yields the remaining budget on every poll. The budget is
 * clamped to `TIMEOUT_CHUNK` so very long waits block in bounded chunks
 * and re-poll transparently.
 */

use crate::limits::{INFINITE_TIMEOUT_MS, TIMEOUT_CHUNK};
use std::time::{Duration, Instant};

/// Absolute point after which a wait reports timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Wait until notified, however long it takes
    Never,
    /// Report timeout once this instant has passed
    At(Instant),
}

impl Deadline {
    /// Compute the deadline for a relative timeout
    ///
    /// Timeouts too large to represent behave as `Never`.
    pub fn after(timeout: Option<Duration>) -> Self {
        match timeout.and_then(|t| Instant::now().checked_add(t)) {
            Some(at) => Deadline::At(at),
            None => Deadline::Never,
        }
    }

    /// Remaining budget for the next blocking call
    ///
    /// `None` means infinite. Never negative: `Some(Duration::ZERO)` once
    /// the deadline has passed.
    #[inline]
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Deadline::Never => None,
            Deadline::At(at) => Some(
                at.saturating_duration_since(Instant::now())
                    .min(TIMEOUT_CHUNK),
            ),
        }
    }

    /// Remaining budget in milliseconds, `INFINITE_TIMEOUT_MS` for no deadline
    pub fn remaining_millis(&self) -> u32 {
        match self.remaining() {
            None => INFINITE_TIMEOUT_MS,
            // Round up so a sub-millisecond remainder still blocks
            Some(d) => {
                let millis = d.as_nanos().div_ceil(1_000_000);
                u32::try_from(millis).unwrap_or(INFINITE_TIMEOUT_MS - 1)
            }
        }
    }

    /// Whether the deadline has passed
    #[inline]
    pub fn has_expired(&self) -> bool {
        match self {
            Deadline::Never => false,
            Deadline::At(at) => Instant::now() >= *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    #[test]
    fn test_no_deadline_is_infinite() {
        let deadline = Deadline::after(None);
        assert_eq!(deadline, Deadline::Never);
        assert_eq!(deadline.remaining(), None);
        assert_eq!(deadline.remaining_millis(), INFINITE_TIMEOUT_MS);
        assert!(!deadline.has_expired());
    }

    #[test]
    fn test_reaches_exactly_zero() {
        let deadline = Deadline::after(Some(Duration::from_millis(10)));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
        assert_eq!(deadline.remaining_millis(), 0);
        assert!(deadline.has_expired());
    }

    #[test]
    fn test_zero_timeout_expires_immediately() {
        let deadline = Deadline::after(Some(Duration::ZERO));
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
        assert!(deadline.has_expired());
    }

    #[test]
    fn test_clamped_to_chunk() {
        let deadline = Deadline::after(Some(Duration::from_secs(365 * 24 * 3600)));
        assert_eq!(deadline.remaining(), Some(TIMEOUT_CHUNK));
        assert_eq!(deadline.remaining_millis(), 864_000_000);
    }

    #[test]
    fn test_unrepresentable_timeout_never_expires() {
        let deadline = Deadline::after(Some(Duration::MAX));
        assert_eq!(deadline, Deadline::Never);
    }

    #[test]
    fn test_remaining_is_non_increasing() {
        let deadline = Deadline::after(Some(Duration::from_millis(30)));
        let mut previous = deadline.remaining().unwrap();
        for _ in 0..20 {
            thread::sleep(Duration::from_millis(2));
            let current = deadline.remaining().unwrap();
            assert!(current <= previous);
            previous = current;
        }
    }

    proptest! {
        #[test]
        fn prop_remaining_never_exceeds_timeout(millis in 0u64..10_000_000_000) {
            let timeout = Duration::from_millis(millis);
            let remaining = Deadline::after(Some(timeout)).remaining().unwrap();
            prop_assert!(remaining <= timeout);
            prop_assert!(remaining <= TIMEOUT_CHUNK);
        }
    }
}
