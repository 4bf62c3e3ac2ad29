/*!
 * Lock-Based Atomics
 *
 * Values too large (or otherwise unsuitable) for hardware atomics are
 * emulated with a striped lock table keyed by address, and waited on
 * indirectly.
 *
 * The address lock table is separate from the wait table, so holding a cell
 * lock never blocks a notifier or waiter of the wait table.
 */

use super::table::table_index;
use super::traits::{Sealed, WaitTarget, Waitable};
use crate::limits::ADDRESS_LOCK_TABLE_SIZE;
use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::fmt;

#[repr(C, align(64))] // Cache-line aligned to prevent false sharing
struct LockSlot {
    mutex: Mutex<()>,
}

static ADDRESS_LOCKS: [LockSlot; ADDRESS_LOCK_TABLE_SIZE] = [const {
    LockSlot {
        mutex: Mutex::new(()),
    }
}; ADDRESS_LOCK_TABLE_SIZE];

/// Striped mutex guarding lock-based atomic operations on `addr`
///
/// Distinct addresses may share a mutex; it is only ever held for a single
/// load/store/exchange.
#[inline]
pub fn address_lock(addr: usize) -> &'static Mutex<()> {
    &ADDRESS_LOCKS[table_index(addr) & (ADDRESS_LOCK_TABLE_SIZE - 1)].mutex
}

/// Atomic cell for any `Copy` value, backed by the address lock table
///
/// Waits and notifications go through the indirect engine, so
/// [`wait`](super::wait::wait) and friends accept it like any atomic.
pub struct LockedAtomic<T> {
    value: UnsafeCell<T>,
}

// SAFETY: every access to `value` happens under the address lock
unsafe impl<T: Send> Sync for LockedAtomic<T> {}

impl<T: Copy> LockedAtomic<T> {
    /// Create a new cell
    pub const fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(value),
        }
    }

    #[inline]
    fn addr(&self) -> usize {
        self.value.get() as usize
    }

    #[inline]
    fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _guard = address_lock(self.addr()).lock();
        // SAFETY: exclusive access under the address lock
        f(unsafe { &mut *self.value.get() })
    }

    /// Read the value
    pub fn load(&self) -> T {
        self.with(|v| *v)
    }

    /// Replace the value
    pub fn store(&self, value: T) {
        self.with(|v| *v = value);
    }

    /// Replace the value, returning the previous one
    pub fn swap(&self, value: T) -> T {
        self.with(|v| std::mem::replace(v, value))
    }

    /// Consume the cell, returning the value
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Copy + PartialEq> LockedAtomic<T> {
    /// Store `new` if the current value equals `current`
    ///
    /// Returns the previous value: `Ok` on success, `Err` otherwise.
    pub fn compare_exchange(&self, current: T, new: T) -> Result<T, T> {
        self.with(|v| {
            if *v == current {
                Ok(std::mem::replace(v, new))
            } else {
                Err(*v)
            }
        })
    }
}

impl<T: Copy + Default> Default for LockedAtomic<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for LockedAtomic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LockedAtomic").field(&self.load()).finish()
    }
}

impl<T> Sealed for LockedAtomic<T> {}

impl<T: Copy + PartialEq + Send> Waitable for LockedAtomic<T> {
    type Value = T;

    #[inline]
    fn load_value(&self) -> T {
        self.load()
    }

    #[inline]
    fn target(&self) -> WaitTarget<'_> {
        WaitTarget::Address(self.addr())
    }

    #[inline]
    fn to_word(_value: T) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{notify_all, wait};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    struct Wide {
        a: u64,
        b: u64,
        c: u64,
    }

    #[test]
    fn test_load_store_swap() {
        let cell = LockedAtomic::new(Wide::default());
        let next = Wide { a: 1, b: 2, c: 3 };
        cell.store(next);
        assert_eq!(cell.load(), next);
        assert_eq!(cell.swap(Wide::default()), next);
        assert_eq!(cell.into_inner(), Wide::default());
    }

    #[test]
    fn test_compare_exchange() {
        let cell = LockedAtomic::new(5u128);
        assert_eq!(cell.compare_exchange(4, 9), Err(5));
        assert_eq!(cell.compare_exchange(5, 9), Ok(5));
        assert_eq!(cell.load(), 9);
    }

    #[test]
    fn test_address_lock_is_stable() {
        let cell = LockedAtomic::new(0u8);
        assert!(std::ptr::eq(address_lock(cell.addr()), address_lock(cell.addr())));
    }

    #[test]
    fn test_wait_on_wide_value() {
        let cell = Arc::new(LockedAtomic::new(Wide::default()));
        let cell_clone = cell.clone();

        let handle = thread::spawn(move || {
            wait(&*cell_clone, Wide::default(), Some(Duration::from_secs(5)))
        });

        thread::sleep(Duration::from_millis(30));
        cell.store(Wide { a: 7, b: 0, c: 0 });
        notify_all(&*cell);

        assert!(handle.join().unwrap().is_ok());
    }
}
