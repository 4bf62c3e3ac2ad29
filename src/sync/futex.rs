/*!
 * Native Wait Primitive
 *
 * Linux `futex(2)` wait/wake on 32-bit words. The table of entry points is
 * what the capability probe resolves and publishes; hosts without a usable
 * primitive resolve to `None` and run on the wait table instead.
 */

use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Resolved native entry points
///
/// `wait` returns `false` only when the primitive reports a timeout.
/// Wake functions return the number of threads woken.
pub(crate) struct NativeApi {
    pub(crate) name: &'static str,
    pub(crate) wait: fn(&AtomicU32, u32, Option<Duration>) -> bool,
    pub(crate) wake_one: fn(&AtomicU32) -> usize,
    pub(crate) wake_all: fn(&AtomicU32) -> usize,
}

impl std::fmt::Debug for NativeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeApi").field("name", &self.name).finish()
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use super::NativeApi;
    use std::ptr;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;
    use tracing::{debug, error};

    pub(crate) static FUTEX: NativeApi = NativeApi {
        name: "futex",
        wait: futex_wait,
        wake_one: futex_wake_one,
        wake_all: futex_wake_all,
    };

    fn errno() -> i32 {
        std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
    }

    fn futex_wait(word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> bool {
        let timespec = timeout.map(|d| libc::timespec {
            tv_sec: d.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
            tv_nsec: d.subsec_nanos() as _,
        });
        let timespec_ptr = match &timespec {
            Some(ts) => ts as *const libc::timespec,
            None => ptr::null(),
        };

        let result = unsafe {
            libc::syscall(
                libc::SYS_futex,
                word.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                expected,
                timespec_ptr,
                ptr::null::<u32>(),
                0u32,
            )
        };
        if result == 0 {
            return true;
        }

        match errno() {
            libc::ETIMEDOUT => false,
            // Value already differs, or a signal interrupted the wait
            libc::EAGAIN | libc::EINTR => true,
            other => {
                error!(errno = other, "futex wait failed unexpectedly");
                std::process::abort();
            }
        }
    }

    fn futex_wake_one(word: &AtomicU32) -> usize {
        futex_wake(word, 1)
    }

    fn futex_wake_all(word: &AtomicU32) -> usize {
        futex_wake(word, i32::MAX)
    }

    fn futex_wake(word: &AtomicU32, count: i32) -> usize {
        let result = unsafe {
            libc::syscall(
                libc::SYS_futex,
                word.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                count,
                ptr::null::<libc::timespec>(),
                ptr::null::<u32>(),
                0u32,
            )
        };
        if result < 0 {
            let code = errno();
            error!(errno = code, "futex wake failed unexpectedly");
            std::process::abort();
        }
        result as usize
    }

    /// Probe the syscall with a zero-count wake on a private word
    #[cfg_attr(feature = "assume-native", allow(dead_code))]
    pub(crate) fn resolve() -> Option<&'static NativeApi> {
        let probe = AtomicU32::new(0);
        let result = unsafe {
            libc::syscall(
                libc::SYS_futex,
                probe.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                0i32,
                ptr::null::<libc::timespec>(),
                ptr::null::<u32>(),
                0u32,
            )
        };
        if result < 0 {
            debug!(errno = errno(), "futex probe rejected");
            return None;
        }
        Some(&FUTEX)
    }
}

#[cfg(target_os = "linux")]
pub(crate) use linux::resolve;

#[cfg(all(target_os = "linux", feature = "assume-native"))]
pub(crate) use linux::FUTEX;

/// No native primitive on this host
#[cfg(not(target_os = "linux"))]
pub(crate) fn resolve() -> Option<&'static NativeApi> {
    None
}
