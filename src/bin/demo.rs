//! Demonstration CLI for the uthreads library.
//!
//! Grounded on the teacher repo's convention of a standalone runnable
//! target backed by `clap`/`env_logger`; here it exercises the round-
//! robin fairness, sleep-ordering and tid-reuse scenarios from
//! `SPEC_FULL.md`'s concrete-scenarios section.

use std::sync::atomic::{AtomicU64, Ordering};

use clap::{Parser, ValueEnum};

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Three threads take turns in strict round-robin order.
    Fairness,
    /// A thread that sleeps wakes up after the requested number of quanta.
    Sleep,
    /// A terminated thread's id is handed back out to the next spawn.
    TidReuse,
    /// The main thread terminates itself, tearing down the whole process.
    MainTerminate,
}

#[derive(Parser)]
#[command(about = "Scenarios demonstrating the uthreads scheduler")]
struct Args {
    #[arg(value_enum)]
    scenario: Scenario,

    /// Quantum length in microseconds.
    #[arg(long, default_value_t = 50_000)]
    quantum_usecs: u64,
}

static COUNTER: AtomicU64 = AtomicU64::new(0);

extern "C" fn fairness_worker() {
    let tid = uthreads::current_thread_id().unwrap();
    for round in 0..3 {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        println!("[order {n}] tid {tid} round {round}");
        uthreads::yield_now().unwrap();
    }
    uthreads::terminate(tid).unwrap();
}

extern "C" fn sleepy_worker() {
    let tid = uthreads::current_thread_id().unwrap();
    println!("tid {tid} sleeping for 3 quanta at quantum {}", uthreads::total_quantums().unwrap());
    uthreads::sleep(3).unwrap();
    println!("tid {tid} woke up at quantum {}", uthreads::total_quantums().unwrap());
    uthreads::terminate(tid).unwrap();
}

extern "C" fn short_lived_worker() {
    let tid = uthreads::current_thread_id().unwrap();
    println!("tid {tid} running, then terminating immediately");
    uthreads::terminate(tid).unwrap();
}

fn run_fairness() {
    for _ in 0..3 {
        uthreads::spawn(Some(fairness_worker)).unwrap();
    }
    for _ in 0..9 {
        uthreads::yield_now().unwrap();
    }
}

fn run_sleep() {
    uthreads::spawn(Some(sleepy_worker)).unwrap();
    for _ in 0..6 {
        uthreads::yield_now().unwrap();
    }
}

fn run_tid_reuse() {
    let first = uthreads::spawn(Some(short_lived_worker)).unwrap();
    uthreads::yield_now().unwrap();
    uthreads::yield_now().unwrap();
    let second = uthreads::spawn(Some(short_lived_worker)).unwrap();
    println!("first spawn got tid {first}, second spawn reused tid {second}");
    uthreads::yield_now().unwrap();
}

extern "C" fn never_dispatched_worker() {
    panic!("main's self-terminate should have torn down the process before this ran");
}

fn run_main_terminate() {
    uthreads::spawn(Some(never_dispatched_worker)).unwrap();
    println!("main terminating itself at quantum {}", uthreads::total_quantums().unwrap());
    uthreads::terminate(uthreads::current_thread_id().unwrap()).unwrap();
    unreachable!("uthreads::terminate(0) never returns");
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    uthreads::init(args.quantum_usecs).expect("init");

    match args.scenario {
        Scenario::Fairness => run_fairness(),
        Scenario::Sleep => run_sleep(),
        Scenario::TidReuse => run_tid_reuse(),
        Scenario::MainTerminate => run_main_terminate(),
    }
}
