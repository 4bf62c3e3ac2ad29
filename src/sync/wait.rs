/*!
 * Atomic Wait API
 *
 * Generic wait/notify over [`Waitable`] storage, layered on the engines:
 * spin briefly, then drive the direct or indirect engine with a stack-owned
 * [`WaitContext`], re-checking the value after every `true` return.
 *
 * 32-bit atomics wait directly on their own storage. Everything else waits
 * indirectly, so notifiers must use the same routing as waiters; both go
 * through [`Waitable::target`].
 */

use super::capability;
use super::context::WaitContext;
use super::direct::wait_direct_with;
use super::indirect::wait_indirect_with;
use super::notify::{notify_all_direct, notify_all_indirect_with, notify_one_direct};
use super::spin::{spin_count, spin_until};
use super::traits::{WaitTarget, Waitable, WakeResult};
use crate::errors::{WaitError, WaitResult};
use std::time::Duration;
use tracing::trace;

/// Block until `atomic` no longer holds `expected`
///
/// Returns `Ok(())` once the value differs, `Err(WaitError::Timeout)` if the
/// timeout elapsed first. `None` waits without limit.
///
/// # Examples
///
/// ```
/// use addr_wait::sync::{notify_all, wait};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use std::thread;
/// use std::time::Duration;
///
/// let flag = Arc::new(AtomicU32::new(0));
/// let writer = flag.clone();
/// let handle = thread::spawn(move || {
///     writer.store(1, Ordering::SeqCst);
///     notify_all(&*writer);
/// });
///
/// wait(&*flag, 0, Some(Duration::from_secs(5))).unwrap();
/// handle.join().unwrap();
/// ```
#[inline]
pub fn wait<A: Waitable>(atomic: &A, expected: A::Value, timeout: Option<Duration>) -> WaitResult<()> {
    wait_while(atomic, timeout, |current| current == expected)
}

/// Block while `still_waiting` holds for the current value
///
/// The predicate is checked before waiting and after every wake, so a
/// change that lands before the wait starts is never missed.
pub fn wait_while<A, F>(atomic: &A, timeout: Option<Duration>, mut still_waiting: F) -> WaitResult<()>
where
    A: Waitable,
    F: FnMut(A::Value) -> bool,
{
    let target = atomic.target();
    let is_direct = matches!(target, WaitTarget::Word(_));

    if spin_until(spin_count(is_direct), || !still_waiting(atomic.load_value())) {
        return Ok(());
    }

    // Resolved once; the level never changes after resolution
    let api = capability::native();
    let mut ctx = WaitContext::new(timeout);

    let result = loop {
        let current = atomic.load_value();
        if !still_waiting(current) {
            break Ok(());
        }

        let keep_waiting = match target {
            WaitTarget::Word(word) => wait_direct_with(api, word, A::to_word(current), &mut ctx),
            WaitTarget::Address(addr) => wait_indirect_with(api, addr, &mut ctx),
        };
        if !keep_waiting {
            trace!(?ctx, "wait timed out");
            break Err(WaitError::Timeout);
        }
    };

    ctx.unwait();
    result
}

/// Wake one thread waiting on `atomic`
///
/// Indirect targets wake every waiter sharing the entry.
#[inline]
pub fn notify_one<A: Waitable>(atomic: &A) -> WakeResult {
    match atomic.target() {
        WaitTarget::Word(word) => notify_one_direct(word),
        WaitTarget::Address(addr) => notify_all_indirect_with(capability::native(), addr),
    }
}

/// Wake all threads waiting on `atomic`
#[inline]
pub fn notify_all<A: Waitable>(atomic: &A) -> WakeResult {
    match atomic.target() {
        WaitTarget::Word(word) => notify_all_direct(word),
        WaitTarget::Address(addr) => notify_all_indirect_with(capability::native(), addr),
    }
}
