/*!
 * addr-wait
 * Wait-on-address ("futex") primitives with a portable wait table fallback
 */

pub mod errors;
pub mod limits;
pub mod monitoring;
pub mod sync;

// Re-exports
pub use errors::{WaitError, WaitResult};
pub use monitoring::init_tracing;
pub use sync::{notify_all, notify_one, wait, wait_while, ApiLevel, LockedAtomic, WaitConfig, Waitable, WakeResult};
