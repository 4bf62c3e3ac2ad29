/*!
 * Wait Table Fallback Tests
 *
 * This test binary forces the wait table implementation before anything
 * waits, then exercises lost-wakeup, spurious-wake and bucket-sharing
 * behavior of the lock + condvar engines.
 */

use addr_wait::sync::{
    api_level, force_fallback, notify_all, notify_all_direct, notify_one, notify_one_direct,
    set_api_level, table_index, unwait_direct, wait, wait_direct, ApiLevel, WaitContext,
};
use addr_wait::WaitError;
use serial_test::serial;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Every test starts here; the first call wins the downgrade
fn fallback() {
    assert!(force_fallback(), "fallback mode must be forced before any wait");
    assert_eq!(api_level(), ApiLevel::Fallback);
}

/// Two distinct words sharing a wait table entry
fn colliding_pair() -> (Arc<Vec<AtomicU32>>, usize, usize) {
    let words: Arc<Vec<AtomicU32>> = Arc::new((0..1024).map(|_| AtomicU32::new(0)).collect());
    let index = |i: usize| table_index(&words[i] as *const AtomicU32 as usize);
    for a in 0..words.len() {
        for b in (a + 1)..words.len() {
            if index(a) == index(b) {
                return (words.clone(), a, b);
            }
        }
    }
    unreachable!("1024 addresses over 256 entries must collide");
}

#[test]
fn test_native_request_after_downgrade_is_rejected() {
    fallback();
    assert_eq!(
        set_api_level(ApiLevel::NativeWait),
        Err(WaitError::ApiLevelUnavailable(ApiLevel::NativeWait))
    );
    // No flapping back
    assert_eq!(api_level(), ApiLevel::Fallback);
}

#[test]
#[serial]
fn test_fallback_wakes_waiter() {
    fallback();
    let value = Arc::new(AtomicU32::new(0));
    let value_clone = value.clone();

    let handle = thread::spawn(move || {
        let start = Instant::now();
        let result = wait(&*value_clone, 0, None);
        (result, start.elapsed())
    });

    thread::sleep(Duration::from_millis(50));
    value.store(1, Ordering::SeqCst);
    notify_one(&*value);

    let (result, elapsed) = handle.join().unwrap();
    assert!(result.is_ok());
    assert!(elapsed < Duration::from_secs(2));
}

#[test]
#[serial]
fn test_fallback_timeout() {
    fallback();
    let value = AtomicU32::new(0);
    let start = Instant::now();

    let result = wait(&value, 0, Some(Duration::from_millis(50)));

    let elapsed = start.elapsed();
    assert_eq!(result, Err(WaitError::Timeout));
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(500));
}

#[test]
fn test_fallback_indirect_wake_all() {
    fallback();
    let value = Arc::new(AtomicU64::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let value = value.clone();
            thread::spawn(move || wait(&*value, 0, Some(Duration::from_secs(5))))
        })
        .collect();

    thread::sleep(Duration::from_millis(100));
    value.store(42, Ordering::SeqCst);
    notify_all(&*value);

    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
}

#[test]
fn test_spurious_wake_resumes_waiting() {
    fallback();
    let value = Arc::new(AtomicU32::new(0));
    let value_clone = value.clone();

    let handle = thread::spawn(move || {
        let start = Instant::now();
        let result = wait(&*value_clone, 0, Some(Duration::from_millis(300)));
        (result, start.elapsed())
    });

    // Wake without changing the value: the waiter must go back to sleep
    for _ in 0..5 {
        thread::sleep(Duration::from_millis(20));
        notify_all(&*value);
    }

    let (result, elapsed) = handle.join().unwrap();
    assert_eq!(result, Err(WaitError::Timeout));
    assert!(elapsed >= Duration::from_millis(300));
}

#[test]
fn test_bucket_sharing_delivers_both_notifications() {
    fallback();
    let (words, a, b) = colliding_pair();
    let ready = Arc::new(Barrier::new(3));

    let handles: Vec<_> = [a, b]
        .into_iter()
        .map(|i| {
            let words = words.clone();
            let ready = ready.clone();
            thread::spawn(move || {
                ready.wait();
                wait(&words[i], 0, Some(Duration::from_secs(5)))
            })
        })
        .collect();

    ready.wait();
    thread::sleep(Duration::from_millis(50));

    // notify_one on a shared entry must not strand the other waiter
    words[a].store(1, Ordering::SeqCst);
    notify_one_direct(&words[a]);
    thread::sleep(Duration::from_millis(20));
    words[b].store(1, Ordering::SeqCst);
    notify_one_direct(&words[b]);

    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
}

#[test]
fn test_unwait_releases_entry_for_other_addresses() {
    fallback();
    let (words, a, b) = colliding_pair();

    // Phase Init takes the shared entry lock
    let mut ctx = WaitContext::new(Some(Duration::from_secs(5)));
    assert!(wait_direct(&words[a], 0, &mut ctx));
    assert!(ctx.holds_lock());

    // Value observed as changed: abandon the wait
    unwait_direct(&mut ctx);
    assert!(!ctx.holds_lock());

    // A notifier on the colliding address must not deadlock
    let words_clone = words.clone();
    let notifier = thread::spawn(move || {
        notify_all_direct(&words_clone[b]);
        true
    });
    assert!(notifier.join().unwrap());
}

#[test]
fn test_no_lost_wakeup_under_contention() {
    fallback();
    const ROUNDS: u32 = 200;

    let value = Arc::new(AtomicU32::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let waiter = {
        let value = value.clone();
        let done = done.clone();
        thread::spawn(move || {
            for round in 0..ROUNDS {
                // Waits for the writer's store of round + 1
                wait(&*value, round, Some(Duration::from_secs(5)))?;
            }
            done.store(true, Ordering::SeqCst);
            Ok::<_, WaitError>(())
        })
    };

    for round in 1..=ROUNDS {
        value.store(round, Ordering::SeqCst);
        notify_one(&*value);
        thread::yield_now();
    }

    assert!(waiter.join().unwrap().is_ok());
    assert!(done.load(Ordering::SeqCst));
}

#[test]
#[serial]
fn test_more_waiters_than_table_entries() {
    fallback();
    const WAITERS: usize = 257;

    let words: Arc<Vec<AtomicU32>> = Arc::new((0..WAITERS).map(|_| AtomicU32::new(0)).collect());
    let wide: Arc<Vec<AtomicU16>> = Arc::new((0..WAITERS).map(|_| AtomicU16::new(0)).collect());
    let ready = Arc::new(Barrier::new(2 * WAITERS + 1));

    let mut handles = Vec::with_capacity(2 * WAITERS);
    for i in 0..WAITERS {
        let (words, ready_direct) = (words.clone(), ready.clone());
        handles.push(thread::spawn(move || {
            ready_direct.wait();
            wait(&words[i], 0, Some(Duration::from_secs(10)))
        }));

        let (wide, ready_indirect) = (wide.clone(), ready.clone());
        handles.push(thread::spawn(move || {
            ready_indirect.wait();
            wait(&wide[i], 0, Some(Duration::from_secs(10)))
        }));
    }

    ready.wait();
    thread::sleep(Duration::from_millis(100));

    for i in 0..WAITERS {
        words[i].store(1, Ordering::SeqCst);
        notify_one(&words[i]);
        wide[i].store(1, Ordering::SeqCst);
        notify_one(&wide[i]);
    }

    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
}
