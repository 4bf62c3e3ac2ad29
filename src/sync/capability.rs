/*!
 * Capability Probe
 *
 * Detects once per process whether a native wait-on-address primitive is
 * usable, and publishes the resolved entry points.
 *
 * # Design
 *
 * A tri-state atomic (`NotInitialized` / `InProgress` / `Initialized`)
 * guards resolution:
 * - Fast path: a single acquire load once initialized
 * - Exactly one thread wins the CAS and resolves; losers spin until it publishes
 * - The resolved pointer is stored relaxed and published by the release store
 *   of `Initialized`
 * - Resolution failure is a permanent downgrade to the wait table
 *
 * Fallback mode can be forced for testing, but only before any real
 * resolution, so waiters never observe the mode change under them.
 */

use super::futex::{self, NativeApi};
use crate::errors::{WaitError, WaitResult};
use serde::{Deserialize, Serialize};
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU8, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

const NOT_INITIALIZED: u8 = 0;
const IN_PROGRESS: u8 = 1;
const INITIALIZED: u8 = 2;

static STATE: AtomicU8 = AtomicU8::new(NOT_INITIALIZED);
static NATIVE_API: AtomicPtr<NativeApi> = AtomicPtr::new(ptr::null_mut());
static RESOLUTIONS: AtomicUsize = AtomicUsize::new(0);

/// Wait implementation level in effect for the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiLevel {
    /// Nothing resolved yet
    NotSet,
    /// Resolution running on another thread
    Detecting,
    /// Wait table (lock + condition variable) emulation
    Fallback,
    /// Native wait-on-address primitive
    NativeWait,
}

/// Resolved native entry points, or `None` when running on the wait table
#[cfg(not(all(target_os = "linux", feature = "assume-native")))]
pub(crate) fn native() -> Option<&'static NativeApi> {
    loop {
        match STATE.load(Ordering::Acquire) {
            INITIALIZED => return published(),
            NOT_INITIALIZED => {
                if STATE
                    .compare_exchange(
                        NOT_INITIALIZED,
                        IN_PROGRESS,
                        Ordering::Acquire,
                        Ordering::Acquire,
                    )
                    .is_ok()
                {
                    return resolve_and_publish();
                }
            }
            _ => spin_while_detecting(),
        }
    }
}

/// Native primitive guaranteed at compile time
#[cfg(all(target_os = "linux", feature = "assume-native"))]
pub(crate) fn native() -> Option<&'static NativeApi> {
    Some(&futex::FUTEX)
}

fn published() -> Option<&'static NativeApi> {
    let api = NATIVE_API.load(Ordering::Relaxed);
    // SAFETY: only null or pointers to a `'static` entry table are stored
    unsafe { api.cast_const().as_ref() }
}

#[cfg_attr(all(target_os = "linux", feature = "assume-native"), allow(dead_code))]
fn resolve_and_publish() -> Option<&'static NativeApi> {
    let resolved = futex::resolve();
    RESOLUTIONS.fetch_add(1, Ordering::Relaxed);

    match resolved {
        Some(api) => {
            debug!(primitive = api.name, "native wait primitive resolved");
            NATIVE_API.store(ptr::from_ref(api).cast_mut(), Ordering::Relaxed);
        }
        None => warn!("native wait primitive unavailable, using wait table"),
    }
    STATE.store(INITIALIZED, Ordering::Release);
    resolved
}

#[cfg_attr(all(target_os = "linux", feature = "assume-native"), allow(dead_code))]
fn spin_while_detecting() {
    let mut spins = 0u32;
    while STATE.load(Ordering::Acquire) == IN_PROGRESS {
        if spins < 100 {
            std::hint::spin_loop();
            spins += 1;
        } else {
            std::thread::yield_now();
        }
    }
}

/// Whether the native wait-on-address primitive is in use
///
/// Performs at most one real resolution per process.
#[inline]
pub fn probe() -> bool {
    native().is_some()
}

/// Current level without triggering resolution
pub fn api_level() -> ApiLevel {
    if cfg!(all(target_os = "linux", feature = "assume-native")) {
        return ApiLevel::NativeWait;
    }
    match STATE.load(Ordering::Acquire) {
        NOT_INITIALIZED => ApiLevel::NotSet,
        IN_PROGRESS => ApiLevel::Detecting,
        _ if published().is_some() => ApiLevel::NativeWait,
        _ => ApiLevel::Fallback,
    }
}

fn level_in_effect() -> ApiLevel {
    if probe() {
        ApiLevel::NativeWait
    } else {
        ApiLevel::Fallback
    }
}

/// Request an implementation level
///
/// `Fallback` only takes effect if it wins the race against the first real
/// resolution; later requests leave the established level alone. Returns the
/// level in effect after the request.
pub fn set_api_level(requested: ApiLevel) -> WaitResult<ApiLevel> {
    match requested {
        ApiLevel::NotSet | ApiLevel::Detecting => Err(WaitError::InvalidApiLevel(requested)),
        ApiLevel::NativeWait => match level_in_effect() {
            ApiLevel::NativeWait => Ok(ApiLevel::NativeWait),
            _ => Err(WaitError::ApiLevelUnavailable(requested)),
        },
        ApiLevel::Fallback => {
            if force_fallback_state() {
                info!("wait implementation forced to wait table");
            }
            Ok(level_in_effect())
        }
    }
}

#[cfg(not(all(target_os = "linux", feature = "assume-native")))]
fn force_fallback_state() -> bool {
    let won = STATE
        .compare_exchange(
            NOT_INITIALIZED,
            IN_PROGRESS,
            Ordering::Acquire,
            Ordering::Acquire,
        )
        .is_ok();
    if won {
        NATIVE_API.store(ptr::null_mut(), Ordering::Relaxed);
        STATE.store(INITIALIZED, Ordering::Release);
    }
    won
}

#[cfg(all(target_os = "linux", feature = "assume-native"))]
fn force_fallback_state() -> bool {
    false
}

/// Force the wait table implementation (testing and diagnostics)
///
/// Returns `true` if fallback mode is in effect afterwards.
pub fn force_fallback() -> bool {
    matches!(set_api_level(ApiLevel::Fallback), Ok(ApiLevel::Fallback))
}

/// Number of real resolutions performed by this process (0 or 1)
pub fn resolution_count() -> usize {
    RESOLUTIONS.load(Ordering::Relaxed)
}
