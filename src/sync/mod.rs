/*!
 * Wait/Notify Subsystem
 *
 * A portable wait-on-address ("futex") abstraction: block until the value at
 * an address changes, and wake one or all such waiters.
 *
 * # Architecture
 *
 * - **Capability probe**: resolves the native primitive once per process
 * - **Wait table**: fixed hash table of lock/condvar/counter entries, used
 *   when the primitive is missing and for indirect waits
 * - **Direct engine**: waits on the watched 32-bit word itself
 * - **Indirect engine**: waits on the change counter of the address's entry
 * - **Notifiers**: wake direct or indirect waiters
 * - **Spin advisor**: how long to spin before blocking
 *
 * Engines are driven by a caller-owned [`WaitContext`] and return `true`
 * ("re-check and call again") or `false` ("deadline passed"). The generic
 * [`wait`] / [`notify_one`] / [`notify_all`] API drives them for any
 * [`Waitable`].
 */

mod capability;
mod cell;
mod config;
mod context;
mod deadline;
mod direct;
mod futex;
mod indirect;
mod notify;
mod spin;
mod table;
mod traits;
mod wait;

pub use capability::{api_level, force_fallback, probe, resolution_count, set_api_level, ApiLevel};
pub use cell::{address_lock, LockedAtomic};
pub use config::{StrategyType, WaitConfig, STRATEGY_ENV};
pub use context::WaitContext;
pub use deadline::Deadline;
pub use direct::{unwait_direct, wait_direct};
pub use indirect::{unwait_indirect, wait_indirect};
pub use notify::{notify_all_direct, notify_all_indirect, notify_one_direct, notify_one_indirect};
pub use spin::{spin_count, spin_until};
pub use table::table_index;
pub use traits::{WaitTarget, Waitable, WakeResult};
pub use wait::{notify_all, notify_one, wait, wait_while};
