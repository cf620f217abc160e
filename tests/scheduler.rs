//! Integration tests for the uthreads scheduler, covering the concrete
//! scenarios from SPEC_FULL.md: round-robin fairness, sleep ordering,
//! block/resume, tid reuse, and the main-thread restrictions.
//!
//! The scheduler is a single process-wide singleton, so every test body
//! runs under `TEST_LOCK` to keep cargo test's parallel test threads
//! from interleaving calls into it. `terminate(0)` calls `process::exit`
//! and is exercised out-of-process instead, by invoking the demo binary.

use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

static TEST_LOCK: Mutex<()> = Mutex::new(());

fn ensure_init() {
    match uthreads::init(10_000) {
        Ok(()) | Err(uthreads::Error::AlreadyInitialized) => {}
        Err(e) => panic!("init failed: {e}"),
    }
}

static ORDER: AtomicUsize = AtomicUsize::new(0);
static SEEN: Mutex<Vec<(usize, u64)>> = Mutex::new(Vec::new());

extern "C" fn fairness_worker() {
    let tid = uthreads::current_thread_id().unwrap();
    for _ in 0..2 {
        let n = ORDER.fetch_add(1, Ordering::SeqCst) as u64;
        SEEN.lock().unwrap().push((tid, n));
        uthreads::yield_now().unwrap();
    }
    uthreads::terminate(tid).unwrap();
}

#[test]
fn round_robin_is_fair_and_fifo() {
    let _guard = TEST_LOCK.lock().unwrap();
    ensure_init();
    SEEN.lock().unwrap().clear();
    ORDER.store(0, Ordering::SeqCst);

    let a = uthreads::spawn(Some(fairness_worker)).unwrap();
    let b = uthreads::spawn(Some(fairness_worker)).unwrap();
    let c = uthreads::spawn(Some(fairness_worker)).unwrap();

    // Drive the three workers to completion from the main thread.
    for _ in 0..8 {
        uthreads::yield_now().unwrap();
    }

    let seen = SEEN.lock().unwrap();
    // First round visits a, b, c in spawn order; second round repeats it.
    let first_round: Vec<usize> = seen.iter().take(3).map(|(tid, _)| *tid).collect();
    assert_eq!(first_round, vec![a, b, c]);
    let second_round: Vec<usize> = seen.iter().skip(3).take(3).map(|(tid, _)| *tid).collect();
    assert_eq!(second_round, vec![a, b, c]);
}

extern "C" fn sleeper() {
    let tid = uthreads::current_thread_id().unwrap();
    let start = uthreads::total_quantums().unwrap();
    uthreads::sleep(3).unwrap();
    let woke = uthreads::total_quantums().unwrap();
    SEEN.lock().unwrap().push((tid, woke - start));
    uthreads::terminate(tid).unwrap();
}

#[test]
fn sleeping_thread_wakes_after_requested_quanta() {
    let _guard = TEST_LOCK.lock().unwrap();
    ensure_init();
    SEEN.lock().unwrap().clear();

    let tid = uthreads::spawn(Some(sleeper)).unwrap();
    for _ in 0..6 {
        uthreads::yield_now().unwrap();
    }

    let seen = SEEN.lock().unwrap();
    let (_, elapsed) = seen.iter().find(|(t, _)| *t == tid).expect("sleeper recorded its wake-up");
    assert!(*elapsed >= 3, "slept only {elapsed} quanta, expected at least 3");
}

extern "C" fn blockable_worker() {
    let tid = uthreads::current_thread_id().unwrap();
    loop {
        SEEN.lock().unwrap().push((tid, 0));
        uthreads::yield_now().unwrap();
    }
}

#[test]
fn blocked_thread_is_not_dispatched_until_resumed() {
    let _guard = TEST_LOCK.lock().unwrap();
    ensure_init();
    SEEN.lock().unwrap().clear();

    let tid = uthreads::spawn(Some(blockable_worker)).unwrap();
    uthreads::yield_now().unwrap(); // let it run once
    uthreads::block_thread(tid).unwrap();

    let runs_before = SEEN.lock().unwrap().iter().filter(|(t, _)| *t == tid).count();
    for _ in 0..3 {
        uthreads::yield_now().unwrap();
    }
    let runs_while_blocked = SEEN.lock().unwrap().iter().filter(|(t, _)| *t == tid).count();
    assert_eq!(runs_before, runs_while_blocked, "blocked thread ran while blocked");

    uthreads::resume_thread(tid).unwrap();
    uthreads::yield_now().unwrap();
    let runs_after_resume = SEEN.lock().unwrap().iter().filter(|(t, _)| *t == tid).count();
    assert!(runs_after_resume > runs_while_blocked, "resumed thread never ran again");

    uthreads::block_thread(tid).unwrap();
}

extern "C" fn short_lived() {
    let tid = uthreads::current_thread_id().unwrap();
    uthreads::terminate(tid).unwrap();
}

#[test]
fn terminated_tid_is_reused_by_next_spawn() {
    let _guard = TEST_LOCK.lock().unwrap();
    ensure_init();

    let first = uthreads::spawn(Some(short_lived)).unwrap();
    uthreads::yield_now().unwrap();
    uthreads::yield_now().unwrap();

    let second = uthreads::spawn(Some(short_lived)).unwrap();
    assert_eq!(first, second, "terminated tid should be handed back out");
    uthreads::yield_now().unwrap();
}

#[test]
fn main_thread_cannot_block_or_sleep_itself() {
    let _guard = TEST_LOCK.lock().unwrap();
    ensure_init();

    assert_eq!(
        uthreads::block_thread(0),
        Err(uthreads::Error::MainThreadRestricted)
    );
    assert_eq!(uthreads::sleep(1), Err(uthreads::Error::MainThreadRestricted));
}

/// The main thread can never be Blocked (it cannot be explicitly blocked
/// or put to sleep), so `resume(0)` always falls through to the
/// RUNNING/READY no-op case rather than erroring.
#[test]
fn resuming_main_thread_is_a_no_op() {
    let _guard = TEST_LOCK.lock().unwrap();
    ensure_init();

    assert_eq!(uthreads::resume_thread(0), Ok(()));
    assert_eq!(uthreads::current_thread_id(), Ok(0));
}

#[test]
fn spawn_rejects_null_entry() {
    let _guard = TEST_LOCK.lock().unwrap();
    ensure_init();
    assert_eq!(uthreads::spawn(None), Err(uthreads::Error::NullEntry));
}

#[test]
fn operations_on_unknown_tid_report_no_such_tid() {
    let _guard = TEST_LOCK.lock().unwrap();
    ensure_init();
    let bogus = 90;
    assert_eq!(
        uthreads::block_thread(bogus),
        Err(uthreads::Error::NoSuchTid(bogus))
    );
    assert_eq!(
        uthreads::terminate(bogus),
        Err(uthreads::Error::NoSuchTid(bogus))
    );
}

/// Terminating tid 0 ends the whole process; exercised out-of-process
/// since it would otherwise kill the test runner.
#[test]
fn terminating_main_thread_exits_process_cleanly() {
    let output = Command::new(env!("CARGO_BIN_EXE_uthreads-demo"))
        .arg("main-terminate")
        .output()
        .expect("failed to run demo binary");
    assert!(output.status.success(), "demo exited with {:?}", output.status);
}
