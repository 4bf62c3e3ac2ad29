/*!
 * Limits and Constants
 *
 * Centralized location for the wait subsystem's sizes, thresholds and
 * sentinel values.
 *
 * - Performance-critical constants are marked with [PERF]
 * - Values mirrored from native primitives are marked with [NATIVE-COMPAT]
 */

use std::time::Duration;

// =============================================================================
// WAIT TABLE
// =============================================================================

/// Wait table size as a power of two (2^8 = 256 entries)
/// [PERF] Bounds memory regardless of how many addresses are waited on
pub const WAIT_TABLE_SIZE_POWER: u32 = 8;

/// Number of wait table entries
pub const WAIT_TABLE_SIZE: usize = 1 << WAIT_TABLE_SIZE_POWER;

/// Mask applied to an address hash to select a table entry
pub const WAIT_TABLE_INDEX_MASK: usize = WAIT_TABLE_SIZE - 1;

/// Address lock table size (256 striped mutexes for lock-based atomics)
/// [PERF] Must be power of 2 for fast modulo via bitmask
pub const ADDRESS_LOCK_TABLE_SIZE: usize = 256;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Longest single blocking call (ten days)
/// Long or infinite logical waits are re-polled in chunks of this size
/// [NATIVE-COMPAT] Fits millisecond-based timeout parameters
pub const TIMEOUT_CHUNK: Duration = Duration::from_millis(864_000_000);

/// Millisecond sentinel for "no timeout"
/// [NATIVE-COMPAT] Matches the INFINITE value of millisecond wait APIs
pub const INFINITE_TIMEOUT_MS: u32 = u32::MAX;

// =============================================================================
// SPINNING
// =============================================================================

/// Spin iterations before blocking on multi-core hosts
/// [PERF] Single-core hosts never spin
pub const MULTICORE_SPIN_COUNT: u32 = 10_000;

/// Yield to the scheduler every N spin iterations
pub const SPIN_YIELD_INTERVAL: u32 = 64;
