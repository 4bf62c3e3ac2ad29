/*!
 * Spin-Count Advisor
 *
 * Advises how long a caller should spin in user space before blocking.
 *
 * - Direct waits on a native primitive: 0 (the primitive spins itself)
 * - Single-core hosts: 0 (spinning steals the only core the writer needs)
 * - Otherwise: `MULTICORE_SPIN_COUNT`, computed once per process
 */

use super::capability;
use crate::limits::{MULTICORE_SPIN_COUNT, SPIN_YIELD_INTERVAL};
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use tracing::debug;

const SPIN_COUNT_UNSET: u32 = u32::MAX;

static SPIN_COUNT: AtomicU32 = AtomicU32::new(SPIN_COUNT_UNSET);

/// Spin iterations to try before calling into the wait engines
pub fn spin_count(is_direct_wait: bool) -> u32 {
    if is_direct_wait && capability::probe() {
        return 0;
    }

    let cached = SPIN_COUNT.load(Ordering::Relaxed);
    if cached != SPIN_COUNT_UNSET {
        return cached;
    }

    let computed = compute_spin_count();
    match SPIN_COUNT.compare_exchange(
        SPIN_COUNT_UNSET,
        computed,
        Ordering::Relaxed,
        Ordering::Relaxed,
    ) {
        Ok(_) => {
            debug!(spin_count = computed, "spin count computed");
            computed
        }
        Err(existing) => existing,
    }
}

fn compute_spin_count() -> u32 {
    let cores = thread::available_parallelism().map_or(1, |n| n.get());
    if cores > 1 {
        MULTICORE_SPIN_COUNT
    } else {
        0
    }
}

/// Spin up to `count` iterations until `done` returns true
///
/// Yields to the scheduler every `SPIN_YIELD_INTERVAL` iterations.
/// Returns whether `done` was observed.
#[inline]
pub fn spin_until(count: u32, mut done: impl FnMut() -> bool) -> bool {
    for spin in 0..count {
        if done() {
            return true;
        }
        if spin % SPIN_YIELD_INTERVAL == SPIN_YIELD_INTERVAL - 1 {
            thread::yield_now();
        } else {
            std::hint::spin_loop();
        }
    }
    false
}
