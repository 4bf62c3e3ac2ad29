/*!
 * addr-wait probe
 *
 * Reports the wait implementation in effect on this host:
 * - Resolved API level (native primitive or wait table)
 * - Spin counts advised for direct and indirect waits
 * - Ping-pong round-trip latency between two threads
 *
 * Environment variables:
 * - ADDR_WAIT_STRATEGY: auto | native | fallback
 * - RUST_LOG / ADDR_WAIT_TRACE_JSON: tracing output
 *
 * Pass `--json` to print the report as JSON.
 */

use addr_wait::sync::{notify_one, spin_count, wait, ApiLevel, WaitConfig};
use addr_wait::{init_tracing, WaitError};
use serde::Serialize;
use std::error::Error;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const ROUND_TRIPS: u32 = 1_000;
const ROUND_TRIP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct ProbeReport {
    api_level: ApiLevel,
    direct_spin_count: u32,
    indirect_spin_count: u32,
    direct_round_trip_ns: u128,
    indirect_round_trip_ns: u128,
}

/// Bounce a counter between two threads, returning the mean round trip
fn ping_pong<A, F>(cell: Arc<A>, bump: F) -> Result<Duration, WaitError>
where
    A: addr_wait::Waitable + Send + 'static,
    A::Value: Into<u64>,
    F: Fn(&A) + Send + Sync + Copy + 'static,
{
    let peer = cell.clone();
    let responder = thread::spawn(move || -> Result<(), WaitError> {
        for round in 0..ROUND_TRIPS {
            let seen = u64::from(round) * 2;
            wait_for(&*peer, seen + 1)?;
            bump(&*peer);
            notify_one(&*peer);
        }
        Ok(())
    });

    let start = Instant::now();
    for round in 0..ROUND_TRIPS {
        bump(&*cell);
        notify_one(&*cell);
        wait_for(&*cell, u64::from(round) * 2 + 2)?;
    }
    let elapsed = start.elapsed();

    match responder.join() {
        Ok(result) => result?,
        Err(_) => warn!("responder thread panicked"),
    }
    Ok(elapsed / ROUND_TRIPS)
}

fn wait_for<A>(cell: &A, target: u64) -> Result<(), WaitError>
where
    A: addr_wait::Waitable,
    A::Value: Into<u64>,
{
    addr_wait::wait_while(cell, Some(ROUND_TRIP_TIMEOUT), |v| Into::<u64>::into(v) < target)
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let json = std::env::args().any(|arg| arg == "--json");
    let level = WaitConfig::from_env().apply()?;
    info!(level = ?level, "wait implementation selected");

    let direct = ping_pong(Arc::new(AtomicU32::new(0)), |c: &AtomicU32| {
        c.fetch_add(1, Ordering::SeqCst);
    })?;
    let indirect = ping_pong(Arc::new(AtomicU64::new(0)), |c: &AtomicU64| {
        c.fetch_add(1, Ordering::SeqCst);
    })?;

    let report = ProbeReport {
        api_level: level,
        direct_spin_count: spin_count(true),
        indirect_spin_count: spin_count(false),
        direct_round_trip_ns: direct.as_nanos(),
        indirect_round_trip_ns: indirect.as_nanos(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("api level:            {:?}", report.api_level);
        println!("spin count (direct):  {}", report.direct_spin_count);
        println!("spin count (indirect): {}", report.indirect_spin_count);
        println!("round trip (direct):  {:?}", direct);
        println!("round trip (indirect): {:?}", indirect);
    }

    // Demonstrates the timeout path end to end
    let idle = AtomicU32::new(0);
    if let Err(e) = wait(&idle, 0, Some(Duration::from_millis(10))) {
        info!(error = %e, "idle wait finished");
    }

    Ok(())
}
