//! API Layer (SPEC_FULL §6.6 / distilled spec §6): the nine free
//! functions that make up this crate's entire public surface. Each one
//! is a thin, documented wrapper over [`crate::scheduler`]; the actual
//! state machine lives there.

use crate::config::Tid;
use crate::context::EntryPoint;
use crate::error::Error;
use crate::scheduler;

/// Initialize the library with a quantum length, in microseconds, and
/// spawn the calling thread as the main thread (tid 0, Running).
///
/// Must be called exactly once, before any other function in this crate.
/// Returns [`Error::BadQuantum`] if `quantum_usecs` is zero, or
/// [`Error::AlreadyInitialized`] if called a second time.
pub fn init(quantum_usecs: u64) -> Result<(), Error> {
    scheduler::init(quantum_usecs).map_err(crate::error::report)
}

/// Spawn a new thread that will start running `entry`, placed at the
/// back of the ready queue. Returns the new thread's id.
///
/// Returns [`Error::NullEntry`] if `entry` is `None`, or
/// [`Error::OutOfTids`] if the library is already tracking the maximum
/// number of threads.
pub fn spawn(entry: Option<EntryPoint>) -> Result<Tid, Error> {
    scheduler::spawn(entry).map_err(crate::error::report)
}

/// Terminate the thread with id `tid`. Terminating the calling thread
/// never returns; terminating tid 0 (the main thread) terminates the
/// whole process, matching the original assignment's contract.
pub fn terminate(tid: Tid) -> Result<(), Error> {
    if tid == crate::config::MAIN_TID {
        std::process::exit(0);
    }
    scheduler::terminate(tid).map_err(crate::error::report)
}

/// Move thread `tid` to the Blocked state. A thread may not block
/// itself out of the ready queue and keep running; blocking the calling
/// thread gives up the CPU immediately. Blocking an already-blocked
/// thread, or one that is asleep, is a no-op.
///
/// Returns [`Error::MainThreadRestricted`] for tid 0.
pub fn block_thread(tid: Tid) -> Result<(), Error> {
    scheduler::block(tid).map_err(crate::error::report)
}

/// Move thread `tid` back to the Ready state. No-op if `tid` isn't
/// currently blocked, or if it's asleep (resuming clears the block but
/// the thread still waits for its wake-up quantum). `tid = 0` is always
/// a no-op, since the main thread can never be Blocked.
///
/// Returns [`Error::NoSuchTid`] if `tid` does not name a live thread.
pub fn resume_thread(tid: Tid) -> Result<(), Error> {
    scheduler::resume(tid).map_err(crate::error::report)
}

/// Put the calling thread to sleep for `quantums` full quanta, then
/// automatically move it back to Ready (unless something else blocked
/// it in the meantime). The main thread may not sleep.
pub fn sleep(quantums: u64) -> Result<(), Error> {
    scheduler::sleep(quantums).map_err(crate::error::report)
}

/// Voluntarily give up the rest of the current quantum to the next
/// Ready thread. A no-op if no other thread is Ready.
pub fn yield_now() -> Result<(), Error> {
    scheduler::yield_now().map_err(crate::error::report)
}

/// The id of the currently running thread.
pub fn current_thread_id() -> Result<Tid, Error> {
    scheduler::current_thread_id().map_err(crate::error::report)
}

/// Total quanta that have started since [`init`], counting the first.
pub fn total_quantums() -> Result<u64, Error> {
    scheduler::total_quantums().map_err(crate::error::report)
}

/// Quanta during which `tid` was the running thread.
///
/// Returns [`Error::NoSuchTid`] if `tid` does not name a live thread.
pub fn thread_quantums(tid: Tid) -> Result<u64, Error> {
    scheduler::quantums_for(tid).map_err(crate::error::report)
}
