/*!
 * Wait Table
 *
 * Fixed, statically allocated array of lock/condvar/counter entries indexed
 * by a hash of the waited-on address.
 *
 * # Design
 *
 * Follows the futex hash-bucket design:
 * - Zero allocations, process lifetime, stable addresses
 * - Memory bounded independently of the number of addresses waited on
 * - Unrelated addresses may share an entry; waiters always re-validate, so
 *   sharing only costs spurious wakeups
 *
 * The entry lock is held across calls of the fallback engines (between the
 * caller's re-check and the blocking call), so the raw lock operations are
 * exposed instead of a guard.
 */

use crate::limits::{WAIT_TABLE_INDEX_MASK, WAIT_TABLE_SIZE};
use parking_lot::{Condvar, Mutex};
use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// A single wait table entry
#[repr(C, align(64))] // Cache-line aligned to prevent false sharing
pub(crate) struct WaitTableEntry {
    counter: AtomicU64,
    lock: Mutex<()>,
    condvar: Condvar,
}

static WAIT_TABLE: [WaitTableEntry; WAIT_TABLE_SIZE] =
    [const { WaitTableEntry::new() }; WAIT_TABLE_SIZE];

/// Hash an address to a wait table index
#[inline]
pub fn table_index(addr: usize) -> usize {
    let mut hasher = ahash::AHasher::default();
    addr.hash(&mut hasher);
    (hasher.finish() as usize) & WAIT_TABLE_INDEX_MASK
}

impl WaitTableEntry {
    const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            lock: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    /// Entry responsible for `addr`
    #[inline]
    pub(crate) fn for_address(addr: usize) -> &'static Self {
        &WAIT_TABLE[table_index(addr)]
    }

    /// Current change counter
    #[inline]
    pub(crate) fn counter(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Bump the change counter; monotonic, used only for change detection
    #[inline]
    pub(crate) fn bump(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Low 32-bit half of the counter, as a futex word
    ///
    /// Every increment changes the low half, so waiting on it with the low
    /// half of a snapshot detects any change since the snapshot.
    #[inline]
    pub(crate) fn counter_word(&self) -> &AtomicU32 {
        let base = self.counter.as_ptr().cast::<u32>();
        let low = if cfg!(target_endian = "little") { 0 } else { 1 };
        // SAFETY: an AtomicU64 is 8-byte aligned and consists of two
        // properly aligned u32 halves living as long as the entry
        unsafe { AtomicU32::from_ptr(base.add(low)) }
    }

    /// Acquire the entry lock and keep it past this call
    #[inline]
    pub(crate) fn lock_held(&self) {
        mem::forget(self.lock.lock());
    }

    /// Release a lock taken with `lock_held`
    ///
    /// # Safety
    ///
    /// The caller must own the lock through a prior `lock_held`.
    #[inline]
    pub(crate) unsafe fn unlock_held(&self) {
        self.lock.force_unlock();
    }

    /// Block on the condvar with the entry lock held
    ///
    /// The lock is atomically released while blocked and held again on
    /// return. Returns `true` on timeout.
    ///
    /// # Safety
    ///
    /// The caller must own the lock through a prior `lock_held`.
    pub(crate) unsafe fn block_held(&self, remaining: Option<Duration>) -> bool {
        let mut guard = self.lock.make_guard_unchecked();
        let timed_out = match remaining {
            Some(timeout) => self.condvar.wait_for(&mut guard, timeout).timed_out(),
            None => {
                self.condvar.wait(&mut guard);
                false
            }
        };
        mem::forget(guard);
        timed_out
    }

    /// Wake every thread blocked on this entry
    ///
    /// Acquiring and releasing the lock first orders the wake after any
    /// waiter that is between its re-check and its blocking call.
    pub(crate) fn wake_all(&self) -> usize {
        drop(self.lock.lock());
        self.condvar.notify_all()
    }
}
