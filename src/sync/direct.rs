/*!
 * Direct Wait Engine
 *
 * Blocks until the 32-bit word at an address differs from a comparand.
 *
 * With the native primitive the comparand check is atomic with sleeping, so
 * one call suffices. On the wait table the engine is a resumable two-phase
 * state machine: the first call takes the entry lock and asks the caller to
 * re-check its condition under that lock; later calls block on the entry's
 * condvar. Holding the lock across the re-check closes the window between
 * "value still equals comparand" and "start waiting".
 */

use super::capability;
use super::context::{WaitContext, WaitPhase};
use super::futex::NativeApi;
use super::table::WaitTableEntry;
use std::sync::atomic::AtomicU32;
use std::time::Duration;
use tracing::trace;

/// Wait until `storage` differs from `comparand`
///
/// Returns `true` when the caller should re-check the value (it may have
/// changed, or the wake was benign), `false` when the deadline passed.
#[inline]
pub fn wait_direct(storage: &AtomicU32, comparand: u32, ctx: &mut WaitContext) -> bool {
    wait_direct_with(capability::native(), storage, comparand, ctx)
}

/// Release anything a direct wait still holds
#[inline]
pub fn unwait_direct(ctx: &mut WaitContext) {
    ctx.unwait();
}

pub(crate) fn wait_direct_with(
    api: Option<&NativeApi>,
    storage: &AtomicU32,
    comparand: u32,
    ctx: &mut WaitContext,
) -> bool {
    match api {
        Some(api) => wait_native(api, storage, comparand, ctx),
        None => wait_fallback(storage, ctx),
    }
}

fn wait_native(api: &NativeApi, storage: &AtomicU32, comparand: u32, ctx: &WaitContext) -> bool {
    let remaining = ctx.deadline.remaining();
    if remaining == Some(Duration::ZERO) {
        return false;
    }
    if (api.wait)(storage, comparand, remaining) {
        return true;
    }
    // A chunked wait timed out before the real deadline: re-poll
    !ctx.deadline.has_expired()
}

fn wait_fallback(storage: &AtomicU32, ctx: &mut WaitContext) -> bool {
    match ctx.phase {
        WaitPhase::Init => {
            let entry = WaitTableEntry::for_address(storage.as_ptr() as usize);
            entry.lock_held();
            ctx.phase = WaitPhase::Locked(entry);
            trace!("direct wait locked entry, re-check requested");
            true
        }
        WaitPhase::Locked(entry) => {
            let remaining = ctx.deadline.remaining();
            if remaining == Some(Duration::ZERO) {
                ctx.unwait();
                return false;
            }
            // SAFETY: `Locked` is only entered after `lock_held`
            let timed_out = unsafe { entry.block_held(remaining) };
            if timed_out && ctx.deadline.has_expired() {
                ctx.unwait();
                return false;
            }
            // Woken, spurious, or a chunk boundary: stay locked and re-check
            true
        }
        WaitPhase::WaitingOnCounter { .. } | WaitPhase::WaitingOnCounterLocked { .. } => {
            debug_assert!(false, "direct wait driven with an indirect wait context");
            ctx.unwait();
            wait_fallback(storage, ctx)
        }
    }
}
