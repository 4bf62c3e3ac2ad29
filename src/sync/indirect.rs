/*!
 * Indirect Wait Engine
 *
 * Waits on the change counter of the wait table entry for an address,
 * for storage that cannot itself be a wait target (wrong size, padding
 * bits, lock-protected values).
 *
 * Notifiers bump the counter before waking, so a waiter that snapshots the
 * counter, re-checks its condition, and then waits for the counter to move
 * away from the snapshot can never sleep through a notification.
 */

use super::capability;
use super::context::{WaitContext, WaitPhase};
use super::futex::NativeApi;
use super::table::WaitTableEntry;
use super::traits::{WaitTarget, Waitable};
use std::time::Duration;
use tracing::trace;

/// Wait table key of a value: the address waiters and notifiers agree on
#[inline]
pub(crate) fn address_of<A: Waitable>(storage: &A) -> usize {
    match storage.target() {
        WaitTarget::Word(word) => word.as_ptr() as usize,
        WaitTarget::Address(addr) => addr,
    }
}

/// Wait for a notification on `storage`
///
/// Returns `true` when the caller should re-check its condition, `false`
/// when the deadline passed.
///
/// Only [`Waitable`] storage is accepted, so a smart pointer has to be
/// dereferenced to the value it shares:
///
/// ```compile_fail
/// use addr_wait::sync::{wait_indirect, WaitContext};
/// use std::sync::atomic::AtomicU64;
/// use std::sync::Arc;
///
/// let value = Arc::new(AtomicU64::new(0));
/// let mut ctx = WaitContext::new(None);
/// // Keys on the Arc, not on the shared value
/// wait_indirect(&value, &mut ctx);
/// ```
#[inline]
pub fn wait_indirect<A: Waitable>(storage: &A, ctx: &mut WaitContext) -> bool {
    wait_indirect_with(capability::native(), address_of(storage), ctx)
}

/// Release anything an indirect wait still holds
#[inline]
pub fn unwait_indirect(ctx: &mut WaitContext) {
    ctx.unwait();
}

pub(crate) fn wait_indirect_with(
    api: Option<&NativeApi>,
    addr: usize,
    ctx: &mut WaitContext,
) -> bool {
    match ctx.phase {
        WaitPhase::Init => {
            let entry = WaitTableEntry::for_address(addr);
            if api.is_none() {
                entry.lock_held();
            }
            let saved = entry.counter();
            ctx.phase = match api {
                Some(_) => WaitPhase::WaitingOnCounter { entry, saved },
                None => WaitPhase::WaitingOnCounterLocked { entry, saved },
            };
            trace!(saved, "indirect wait took counter snapshot");
            true
        }
        WaitPhase::WaitingOnCounter { entry, saved } => match api {
            Some(api) => wait_counter_native(api, entry, saved, ctx),
            None => {
                debug_assert!(false, "native indirect phase driven in fallback mode");
                ctx.unwait();
                true
            }
        },
        WaitPhase::WaitingOnCounterLocked { entry, saved } => {
            wait_counter_fallback(entry, saved, ctx)
        }
        WaitPhase::Locked(_) => {
            debug_assert!(false, "indirect wait driven with a direct wait context");
            ctx.unwait();
            wait_indirect_with(api, addr, ctx)
        }
    }
}

fn wait_counter_native(
    api: &NativeApi,
    entry: &'static WaitTableEntry,
    saved: u64,
    ctx: &mut WaitContext,
) -> bool {
    let remaining = ctx.deadline.remaining();
    if remaining == Some(Duration::ZERO) {
        ctx.phase = WaitPhase::Init;
        return false;
    }
    // Returns immediately if the counter moved since the snapshot
    let woken = (api.wait)(entry.counter_word(), saved as u32, remaining);
    ctx.phase = WaitPhase::Init;
    woken || !ctx.deadline.has_expired()
}

fn wait_counter_fallback(entry: &'static WaitTableEntry, saved: u64, ctx: &mut WaitContext) -> bool {
    if entry.counter() != saved {
        ctx.unwait();
        return true;
    }
    let remaining = ctx.deadline.remaining();
    if remaining == Some(Duration::ZERO) {
        ctx.unwait();
        return false;
    }

    // SAFETY: `WaitingOnCounterLocked` is only entered after `lock_held`
    let timed_out = unsafe { entry.block_held(remaining) };
    if entry.counter() != saved {
        ctx.unwait();
        return true;
    }
    if timed_out && ctx.deadline.has_expired() {
        ctx.unwait();
        return false;
    }
    // Spurious wake: keep the lock and snapshot, caller re-checks
    true
}
