/*!
 * Wait Context
 *
 * Caller-owned state of one logical wait, carried across repeated engine
 * calls. The phase is an explicit state machine so the contract (who holds
 * which lock, and who must release it) stays inspectable.
 */

use super::deadline::Deadline;
use super::table::WaitTableEntry;
use std::fmt;
use std::time::Duration;

/// Engine phase of a logical wait
#[derive(Clone, Copy, Default)]
pub(crate) enum WaitPhase {
    /// Nothing held; the next engine call starts a fresh round
    #[default]
    Init,
    /// Direct fallback: entry lock held by this context
    Locked(&'static WaitTableEntry),
    /// Indirect native: counter snapshot taken, nothing held
    WaitingOnCounter {
        entry: &'static WaitTableEntry,
        saved: u64,
    },
    /// Indirect fallback: counter snapshot taken, entry lock held
    WaitingOnCounterLocked {
        entry: &'static WaitTableEntry,
        saved: u64,
    },
}

impl WaitPhase {
    fn name(&self) -> &'static str {
        match self {
            WaitPhase::Init => "init",
            WaitPhase::Locked(_) => "locked",
            WaitPhase::WaitingOnCounter { .. } => "waiting_on_counter",
            WaitPhase::WaitingOnCounterLocked { .. } => "waiting_on_counter_locked",
        }
    }
}

/// State of one logical wait operation
///
/// Create one per logical wait, pass it to every engine call, and call
/// [`WaitContext::unwait`] (or drop it) once the wait concludes. A context
/// must not be reused across unrelated waits.
pub struct WaitContext {
    pub(crate) deadline: Deadline,
    pub(crate) phase: WaitPhase,
}

impl WaitContext {
    /// Start a wait with an optional relative timeout
    pub fn new(timeout: Option<Duration>) -> Self {
        Self::with_deadline(Deadline::after(timeout))
    }

    /// Start a wait against an existing deadline
    pub fn with_deadline(deadline: Deadline) -> Self {
        Self {
            deadline,
            phase: WaitPhase::Init,
        }
    }

    /// Deadline of this wait
    #[inline]
    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Whether a fallback entry lock is currently held
    #[inline]
    pub fn holds_lock(&self) -> bool {
        matches!(
            self.phase,
            WaitPhase::Locked(_) | WaitPhase::WaitingOnCounterLocked { .. }
        )
    }

    /// Counter snapshot of an indirect wait in progress
    #[inline]
    pub fn saved_counter(&self) -> Option<u64> {
        match self.phase {
            WaitPhase::WaitingOnCounter { saved, .. }
            | WaitPhase::WaitingOnCounterLocked { saved, .. } => Some(saved),
            _ => None,
        }
    }

    /// Abandon the wait: release any fallback lock and return to `Init`
    ///
    /// No-op on the native paths. Idempotent.
    pub fn unwait(&mut self) {
        match std::mem::take(&mut self.phase) {
            WaitPhase::Locked(entry) | WaitPhase::WaitingOnCounterLocked { entry, .. } => {
                // SAFETY: these phases are only entered after `lock_held`
                unsafe { entry.unlock_held() }
            }
            WaitPhase::Init | WaitPhase::WaitingOnCounter { .. } => {}
        }
    }
}

impl Drop for WaitContext {
    fn drop(&mut self) {
        self.unwait();
    }
}

impl fmt::Debug for WaitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitContext")
            .field("deadline", &self.deadline)
            .field("phase", &self.phase.name())
            .field("saved_counter", &self.saved_counter())
            .finish()
    }
}
