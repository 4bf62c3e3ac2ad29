/*!
 * Synchronization Traits
 *
 * Wake results and the `Waitable` abstraction the higher-level wait API is
 * generic over.
 */

use std::sync::atomic::{
    AtomicBool, AtomicI16, AtomicI32, AtomicI64, AtomicI8, AtomicIsize, AtomicU16, AtomicU32,
    AtomicU64, AtomicU8, AtomicUsize, Ordering,
};

/// Result of a wake operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// Successfully woke N waiters (N >= 1)
    Woken(usize),
    /// No waiters were waiting
    NoWaiters,
}

impl WakeResult {
    #[inline(always)]
    pub(crate) fn from_count(count: usize) -> Self {
        if count == 0 {
            WakeResult::NoWaiters
        } else {
            WakeResult::Woken(count)
        }
    }

    /// Check if any waiters were woken
    #[inline(always)]
    pub fn is_woken(&self) -> bool {
        matches!(self, WakeResult::Woken(_))
    }

    /// Get number of woken waiters (0 if none)
    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            WakeResult::Woken(n) => *n,
            WakeResult::NoWaiters => 0,
        }
    }
}

/// Where waiters of a value block
#[derive(Debug, Clone, Copy)]
pub enum WaitTarget<'a> {
    /// The storage itself is a 32-bit wait word
    Word(&'a AtomicU32),
    /// Storage is keyed by address and waited on through its entry counter
    Address(usize),
}

mod private {
    pub trait Sealed {}
}

/// Storage that can be waited on for a value change
///
/// Sealed: implemented for the standard atomics and
/// [`LockedAtomic`](super::cell::LockedAtomic).
pub trait Waitable: private::Sealed + Sync {
    /// Observed value type
    type Value: Copy + PartialEq;

    /// Read the current value
    fn load_value(&self) -> Self::Value;

    /// Wait target used by waiters and notifiers
    fn target(&self) -> WaitTarget<'_>;

    /// Bit pattern of a value as a wait word
    ///
    /// Only consulted for [`WaitTarget::Word`] targets.
    fn to_word(value: Self::Value) -> u32;
}

impl private::Sealed for AtomicU32 {}

impl Waitable for AtomicU32 {
    type Value = u32;

    #[inline]
    fn load_value(&self) -> u32 {
        self.load(Ordering::SeqCst)
    }

    #[inline]
    fn target(&self) -> WaitTarget<'_> {
        WaitTarget::Word(self)
    }

    #[inline]
    fn to_word(value: u32) -> u32 {
        value
    }
}

impl private::Sealed for AtomicI32 {}

impl Waitable for AtomicI32 {
    type Value = i32;

    #[inline]
    fn load_value(&self) -> i32 {
        self.load(Ordering::SeqCst)
    }

    #[inline]
    fn target(&self) -> WaitTarget<'_> {
        // SAFETY: AtomicI32 and AtomicU32 share size, alignment and
        // representation; the view lives as long as `self`
        WaitTarget::Word(unsafe { AtomicU32::from_ptr(self.as_ptr().cast::<u32>()) })
    }

    #[inline]
    fn to_word(value: i32) -> u32 {
        value as u32
    }
}

/// Atomics other than the 32-bit word wait through the entry counter
macro_rules! indirect_waitable {
    ($($atomic:ty => $value:ty),* $(,)?) => {
        $(
            impl private::Sealed for $atomic {}

            impl Waitable for $atomic {
                type Value = $value;

                #[inline]
                fn load_value(&self) -> $value {
                    self.load(Ordering::SeqCst)
                }

                #[inline]
                fn target(&self) -> WaitTarget<'_> {
                    WaitTarget::Address(self as *const $atomic as usize)
                }

                #[inline]
                fn to_word(_value: $value) -> u32 {
                    0
                }
            }
        )*
    };
}

indirect_waitable! {
    AtomicBool => bool,
    AtomicU8 => u8,
    AtomicI8 => i8,
    AtomicU16 => u16,
    AtomicI16 => i16,
    AtomicU64 => u64,
    AtomicI64 => i64,
    AtomicUsize => usize,
    AtomicIsize => isize,
}

pub(crate) use private::Sealed;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_result_from_count() {
        assert_eq!(WakeResult::from_count(0), WakeResult::NoWaiters);
        assert_eq!(WakeResult::from_count(3), WakeResult::Woken(3));
        assert!(WakeResult::Woken(1).is_woken());
        assert_eq!(WakeResult::NoWaiters.count(), 0);
    }

    #[test]
    fn test_i32_shares_word() {
        let value = AtomicI32::new(-1);
        match value.target() {
            WaitTarget::Word(word) => assert_eq!(word.load(Ordering::SeqCst), u32::MAX),
            WaitTarget::Address(_) => panic!("i32 should wait directly"),
        }
        assert_eq!(AtomicI32::to_word(-1), u32::MAX);
    }

    #[test]
    fn test_wide_atomics_wait_indirectly() {
        let value = AtomicU64::new(0);
        assert!(matches!(value.target(), WaitTarget::Address(_)));
        let flag = AtomicBool::new(false);
        assert!(matches!(flag.target(), WaitTarget::Address(_)));
    }
}
