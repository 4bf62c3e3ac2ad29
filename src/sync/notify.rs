/*!
 * Notifiers
 *
 * Wake threads waiting directly or indirectly on an address.
 *
 * Indirect wakeups are never single-target: the counter of an entry is
 * shared by every address hashing to it, so a counter bump cannot be tied to
 * one logical waiter. Waking all is always safe because every waiter
 * re-validates its own condition.
 */

use super::capability;
use super::futex::NativeApi;
use super::indirect::address_of;
use super::table::WaitTableEntry;
use super::traits::{Waitable, WakeResult};
use std::sync::atomic::AtomicU32;

/// Wake one thread waiting directly on `storage`
///
/// On the wait table this wakes every waiter of the entry, since unrelated
/// addresses may share it.
#[inline]
pub fn notify_one_direct(storage: &AtomicU32) -> WakeResult {
    notify_one_direct_with(capability::native(), storage)
}

/// Wake all threads waiting directly on `storage`
#[inline]
pub fn notify_all_direct(storage: &AtomicU32) -> WakeResult {
    notify_all_direct_with(capability::native(), storage)
}

/// Wake threads waiting indirectly on `storage` (same as notify all)
#[inline]
pub fn notify_one_indirect<A: Waitable>(storage: &A) -> WakeResult {
    notify_all_indirect(storage)
}

/// Wake all threads waiting indirectly on `storage`
///
/// Keyed like [`wait_indirect`](super::indirect::wait_indirect): pass the
/// shared value, not a pointer to it.
///
/// ```compile_fail
/// use addr_wait::sync::notify_all_indirect;
/// use std::sync::atomic::AtomicBool;
/// use std::sync::Arc;
///
/// let flag = Arc::new(AtomicBool::new(false));
/// notify_all_indirect(&flag);
/// ```
#[inline]
pub fn notify_all_indirect<A: Waitable>(storage: &A) -> WakeResult {
    notify_all_indirect_with(capability::native(), address_of(storage))
}

pub(crate) fn notify_one_direct_with(api: Option<&NativeApi>, storage: &AtomicU32) -> WakeResult {
    match api {
        Some(api) => WakeResult::from_count((api.wake_one)(storage)),
        None => wake_entry(storage.as_ptr() as usize),
    }
}

pub(crate) fn notify_all_direct_with(api: Option<&NativeApi>, storage: &AtomicU32) -> WakeResult {
    match api {
        Some(api) => WakeResult::from_count((api.wake_all)(storage)),
        None => wake_entry(storage.as_ptr() as usize),
    }
}

pub(crate) fn notify_all_indirect_with(api: Option<&NativeApi>, addr: usize) -> WakeResult {
    let entry = WaitTableEntry::for_address(addr);
    // Strictly before the wake: a waiter that already saw the new count
    // never blocks on the old one
    entry.bump();
    match api {
        Some(api) => WakeResult::from_count((api.wake_all)(entry.counter_word())),
        None => WakeResult::from_count(entry.wake_all()),
    }
}

fn wake_entry(addr: usize) -> WakeResult {
    WakeResult::from_count(WaitTableEntry::for_address(addr).wake_all())
}
