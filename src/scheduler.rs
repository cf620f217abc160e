//! Scheduler Core (SPEC_FULL §6.5 / distilled spec §4.4-4.5).
//!
//! Owns the single global scheduler instance and every operation that
//! touches more than one of the Tid Allocator / Thread Table / Ready
//! Queue / Sleep Set at once: dispatch, preemption, and the voluntary
//! block/resume/sleep/terminate paths.
//!
//! Grounded on `src/scheduler/mod.rs` of the teacher repo for the overall
//! shape (a `spin::Mutex<Option<Scheduler>>` singleton, free functions
//! operating on it, atomics for fields read outside the lock) and on
//! `src/scheduler/scheduler.rs` for the dispatch bookkeeping, generalized
//! from an interrupt-driven kernel scheduler to a signal/ucontext-driven
//! userspace one.

use log::{debug, info, trace};
use spin::Mutex;

use crate::config::{Tid, MAIN_TID};
use crate::context::{Context, EntryPoint};
use crate::error::{fail, Error};
use crate::ready_queue::ReadyQueue;
use crate::sleep_set::SleepSet;
use crate::table::ThreadTable;
use crate::thread::{ThreadDescriptor, ThreadState};
use crate::tid_allocator::TidAllocator;
use crate::timer;

static SCHEDULER: Mutex<Option<Scheduler>> = Mutex::new(None);

struct Scheduler {
    table: ThreadTable,
    ready: ReadyQueue,
    sleeping: SleepSet,
    allocator: TidAllocator,
    running: Tid,
    total_quantums: u64,
    quantum_usecs: u64,
}

impl Scheduler {
    fn new(quantum_usecs: u64) -> Self {
        let mut table = ThreadTable::new();
        table.insert(ThreadDescriptor::main(MAIN_TID));
        Scheduler {
            table,
            ready: ReadyQueue::new(),
            sleeping: SleepSet::new(),
            allocator: TidAllocator::new(),
            running: MAIN_TID,
            total_quantums: 1,
            quantum_usecs,
        }
    }

    /// Move every sleeping thread whose wake-up time has arrived back to
    /// Ready. Distilled spec §4.4: evaluated once per quantum, before the
    /// next thread is picked, so a thread can wake and be dispatched in
    /// the very quantum it was due.
    fn wake_sleepers(&mut self) {
        let due: Vec<Tid> = self
            .sleeping
            .iter()
            .filter(|&tid| self.table.get(tid).and_then(|d| d.wake_at) == Some(self.total_quantums))
            .collect();
        for tid in due {
            self.sleeping.remove(tid);
            if let Some(desc) = self.table.get_mut(tid) {
                desc.wake_at = None;
                // A thread that was put to sleep while also explicitly
                // blocked stays blocked until `resume_thread` is called
                // (distilled spec §8, "sleep while blocked").
                if desc.user_blocked {
                    trace!("tid {tid} wake-up quantum reached but still user-blocked");
                } else {
                    desc.state = ThreadState::Ready;
                    self.ready.push_back(tid);
                    trace!("tid {tid} woke up");
                }
            }
        }
    }
}

/// Install the library: create the main thread (tid 0, Running), arm the
/// timer and handler, and publish the singleton. Distilled spec §4.6.
pub(crate) fn init(quantum_usecs: u64) -> Result<(), Error> {
    if quantum_usecs == 0 {
        return Err(Error::BadQuantum);
    }
    let mut guard = SCHEDULER.lock();
    if guard.is_some() {
        return Err(Error::AlreadyInitialized);
    }

    if let Err(e) = timer::install_handler() {
        fail(e);
    }
    if let Err(e) = timer::arm(quantum_usecs) {
        fail(e);
    }

    *guard = Some(Scheduler::new(quantum_usecs));
    info!("uthreads initialized, quantum = {quantum_usecs}us");
    Ok(())
}

fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler) -> R) -> Result<R, Error> {
    let mut guard = SCHEDULER.lock();
    match guard.as_mut() {
        Some(s) => Ok(f(s)),
        None => Err(Error::NotInitialized),
    }
}

/// Spawn a new thread running `entry`, Ready, at the back of the queue.
/// Distilled spec §4.6.
pub(crate) fn spawn(entry: Option<EntryPoint>) -> Result<Tid, Error> {
    let entry = entry.ok_or(Error::NullEntry)?;
    let _cs = timer::CriticalSection::enter().unwrap_or_else(|e| fail(e));

    let mut guard = SCHEDULER.lock();
    let scheduler = guard.as_mut().ok_or(Error::NotInitialized)?;

    let tid = scheduler.allocator.acquire()?;
    let descriptor = match ThreadDescriptor::spawned(tid, entry) {
        Ok(d) => d,
        Err(e) => {
            scheduler.allocator.release(tid);
            fail(e);
        }
    };
    scheduler.table.insert(descriptor);
    scheduler.ready.push_back(tid);
    debug!("spawned tid {tid}");
    Ok(tid)
}

/// Terminate `tid`. If it names the running thread, dispatches the next
/// Ready thread and never returns to the caller (distilled spec §4.5,
/// "terminate-self path").
pub(crate) fn terminate(tid: Tid) -> Result<(), Error> {
    let _cs = timer::CriticalSection::enter().unwrap_or_else(|e| fail(e));

    let is_self = {
        let mut guard = SCHEDULER.lock();
        let scheduler = guard.as_mut().ok_or(Error::NotInitialized)?;
        if !scheduler.table.contains(tid) {
            return Err(Error::NoSuchTid(tid));
        }
        let is_self = tid == scheduler.running;
        if !is_self {
            remove_non_running(scheduler, tid);
        }
        is_self
    };

    if is_self {
        // terminate_self drops the lock itself right before the one-way
        // jump; it never returns.
        terminate_self(tid);
    }
    Ok(())
}

fn remove_non_running(scheduler: &mut Scheduler, tid: Tid) {
    scheduler.ready.remove(tid);
    scheduler.sleeping.remove(tid);
    scheduler.table.remove(tid);
    scheduler.allocator.release(tid);
    debug!("terminated tid {tid}");
}

/// Same-process exit handling for a thread terminating itself: free its
/// own descriptor, pick the next Ready thread, and jump into it without
/// saving anything (there is nothing left to resume).
fn terminate_self(tid: Tid) -> ! {
    let mut guard = SCHEDULER.lock();
    let scheduler = guard.as_mut().expect("scheduler initialized");

    scheduler.table.remove(tid);
    scheduler.allocator.release(tid);
    debug!("terminated tid {tid} (self)");

    scheduler.total_quantums += 1;
    scheduler.wake_sleepers();
    let next = scheduler
        .ready
        .pop_front()
        .expect("at least the main thread's own terminate never reaches here, and some thread must always be runnable");

    scheduler.running = next;
    let next_desc = scheduler.table.get_mut(next).expect("next thread exists");
    next_desc.state = ThreadState::Running;
    next_desc.quantums_run += 1;
    // SAFETY: `next` is a live descriptor distinct from the one just
    // freed; its context was captured with an unmasked signal mask.
    let next_ctx = unsafe { scheduler.table.raw_mut(next).unwrap() };

    if let Err(e) = timer::arm(scheduler.quantum_usecs) {
        fail(e);
    }
    drop(guard);
    if let Err(e) = timer::unblock() {
        fail(e);
    }

    // SAFETY: next_ctx is valid and was produced by install_entry/swap_into.
    unsafe { Context::set_into(&(*next_ctx).context) }
}

/// Called from the trampoline when a spawned thread's entry function
/// returns instead of calling `terminate` itself.
pub(crate) fn terminate_self_from_trampoline() -> ! {
    if let Err(e) = timer::block() {
        fail(e);
    }
    let tid = current_thread_id().unwrap_or(MAIN_TID);
    terminate_self(tid)
}

/// Move `tid` to Blocked. A thread cannot block itself out of existence
/// without yielding the CPU, so blocking the running thread also
/// dispatches the next Ready thread (distilled spec §4.5).
pub(crate) fn block(tid: Tid) -> Result<(), Error> {
    if tid == MAIN_TID {
        return Err(Error::MainThreadRestricted);
    }
    let _cs = timer::CriticalSection::enter().unwrap_or_else(|e| fail(e));

    let blocks_running = {
        let mut guard = SCHEDULER.lock();
        let scheduler = guard.as_mut().ok_or(Error::NotInitialized)?;
        if !scheduler.table.contains(tid) {
            return Err(Error::NoSuchTid(tid));
        }
        let desc = scheduler.table.get_mut(tid).unwrap();
        let was_running = scheduler.running == tid;
        if desc.state == ThreadState::Ready {
            scheduler.ready.remove(tid);
        }
        desc.state = ThreadState::Blocked;
        desc.user_blocked = true;
        was_running
    };

    if blocks_running {
        dispatch_from_running();
    }
    Ok(())
}

/// Move `tid` back to Ready (or Running, if it's the currently running
/// thread — a no-op either way). Distilled spec §4.5. Unlike `block` and
/// `sleep`, the main thread is not restricted here: it can never be
/// Blocked (it cannot be explicitly blocked or put to sleep), so
/// `resume(0)` always falls through to the RUNNING/READY no-op case.
pub(crate) fn resume(tid: Tid) -> Result<(), Error> {
    let _cs = timer::CriticalSection::enter().unwrap_or_else(|e| fail(e));
    with_scheduler(|scheduler| {
        if !scheduler.table.contains(tid) {
            return Err(Error::NoSuchTid(tid));
        }
        let desc = scheduler.table.get_mut(tid).unwrap();
        desc.user_blocked = false;
        // Still asleep: stays off the ready queue until its wake-up
        // quantum arrives, at which point `wake_sleepers` will see
        // `user_blocked == false` and dispatch it.
        if desc.state == ThreadState::Blocked && desc.wake_at.is_none() {
            desc.state = ThreadState::Ready;
            scheduler.ready.push_back(tid);
            trace!("tid {tid} resumed");
        }
        Ok(())
    })?
}

/// Put the running thread to sleep for `quantums` full quanta. Main
/// thread may not sleep (distilled spec §4.5 edge cases).
pub(crate) fn sleep(quantums: u64) -> Result<(), Error> {
    let _cs = timer::CriticalSection::enter().unwrap_or_else(|e| fail(e));

    {
        let mut guard = SCHEDULER.lock();
        let scheduler = guard.as_mut().ok_or(Error::NotInitialized)?;
        if scheduler.running == MAIN_TID {
            return Err(Error::MainThreadRestricted);
        }
        let tid = scheduler.running;
        let wake_at = scheduler.total_quantums + quantums;
        let desc = scheduler.table.get_mut(tid).unwrap();
        desc.wake_at = Some(wake_at);
        desc.state = ThreadState::Blocked;
        scheduler.sleeping.insert(tid);
        trace!("tid {tid} sleeping until quantum {wake_at}");
    }
    dispatch_from_running();
    Ok(())
}

/// Voluntarily give up the remainder of the current quantum.
pub(crate) fn yield_now() -> Result<(), Error> {
    let _cs = timer::CriticalSection::enter().unwrap_or_else(|e| fail(e));
    {
        let mut guard = SCHEDULER.lock();
        let scheduler = guard.as_mut().ok_or(Error::NotInitialized)?;
        let tid = scheduler.running;
        let desc = scheduler.table.get_mut(tid).unwrap();
        desc.state = ThreadState::Ready;
        scheduler.ready.push_back(tid);
    }
    dispatch_from_running();
    Ok(())
}

/// Shared tail of every voluntary path that gives up the CPU: rearm the
/// timer, wake due sleepers, pick next, and swap. The running thread has
/// already been moved off Running by the caller (onto Ready, Blocked, or
/// removed from the table entirely for terminate-self).
fn dispatch_from_running() {
    let mut guard = SCHEDULER.lock();
    let scheduler = guard.as_mut().expect("scheduler initialized");

    let outgoing = scheduler.running;
    scheduler.total_quantums += 1;
    scheduler.wake_sleepers();

    // Callers that want the outgoing thread itself to remain a dispatch
    // candidate (yield_now) already pushed it back onto the ready queue
    // before calling this function, so it's the one valid way `next` can
    // come back equal to `outgoing` here. Callers that took the outgoing
    // thread off the ready queue entirely (block, sleep) guarantee some
    // other thread (if nothing else, the main thread) is ready instead.
    let next = scheduler
        .ready
        .pop_front()
        .expect("at least one thread is always ready when another voluntarily yields the cpu");
    scheduler.running = next;
    let next_desc = scheduler.table.get_mut(next).expect("next thread exists");
    next_desc.state = ThreadState::Running;
    next_desc.quantums_run += 1;

    if let Err(e) = timer::arm(scheduler.quantum_usecs) {
        fail(e);
    }

    if next == outgoing {
        drop(guard);
        if let Err(e) = timer::unblock() {
            fail(e);
        }
        return;
    }

    // SAFETY: outgoing and next are distinct, both live in the table.
    let out_ctx = unsafe { scheduler.table.raw_mut(outgoing).unwrap() };
    let next_ctx = unsafe { scheduler.table.raw_mut(next).unwrap() };
    drop(guard);

    if let Err(e) = timer::unblock() {
        fail(e);
    }
    // SAFETY: both pointers point at live, distinct descriptors obtained
    // under the lock just released; `next`'s context is either freshly
    // installed or was captured with an unmasked signal mask.
    unsafe {
        if let Err(e) = Context::swap_into(&mut (*out_ctx).context, &(*next_ctx).context) {
            fail(e);
        }
    }
}

/// The SIGVTALRM handler's entry point: a whole quantum elapsed for the
/// running thread without it giving up the CPU voluntarily. Distilled
/// spec §4.4, "preemption tick". Runs with SIGVTALRM already blocked by
/// the kernel for the duration of the handler (default `sigaction`
/// semantics), so no explicit `block()` call is needed on entry.
pub(crate) fn on_preemption_signal() {
    let mut guard = SCHEDULER.lock();
    let scheduler = match guard.as_mut() {
        Some(s) => s,
        None => return,
    };

    let outgoing = scheduler.running;
    scheduler.total_quantums += 1;
    if let Some(desc) = scheduler.table.get_mut(outgoing) {
        desc.state = ThreadState::Ready;
    }
    scheduler.ready.push_back(outgoing);
    scheduler.wake_sleepers();

    let next = scheduler.ready.pop_front().expect("outgoing thread just re-queued itself");
    scheduler.running = next;
    let next_desc = scheduler.table.get_mut(next).expect("next thread exists");
    next_desc.state = ThreadState::Running;
    next_desc.quantums_run += 1;

    if next == outgoing {
        // Only one runnable thread: re-arm and fall back into it without
        // a context switch.
        if let Err(e) = timer::arm(scheduler.quantum_usecs) {
            fail(e);
        }
        return;
    }

    // SAFETY: outgoing and next are distinct, both live in the table.
    let out_ctx = unsafe { scheduler.table.raw_mut(outgoing).unwrap() };
    let next_ctx = unsafe { scheduler.table.raw_mut(next).unwrap() };

    if let Err(e) = timer::arm(scheduler.quantum_usecs) {
        fail(e);
    }
    drop(guard);

    if let Err(e) = timer::unblock() {
        fail(e);
    }
    // SAFETY: see on_preemption_signal's doc comment and dispatch_from_running.
    unsafe {
        if let Err(e) = Context::swap_into(&mut (*out_ctx).context, &(*next_ctx).context) {
            fail(e);
        }
    }
}

pub(crate) fn current_thread_id() -> Result<Tid, Error> {
    with_scheduler(|s| s.running)
}

pub(crate) fn total_quantums() -> Result<u64, Error> {
    with_scheduler(|s| s.total_quantums)
}

pub(crate) fn quantums_for(tid: Tid) -> Result<u64, Error> {
    with_scheduler(|s| {
        s.table
            .get(tid)
            .map(|d| d.quantums_run)
            .ok_or(Error::NoSuchTid(tid))
    })?
}

#[cfg(test)]
pub(crate) fn reset_for_test() {
    *SCHEDULER.lock() = None;
}
