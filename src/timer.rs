//! Timer & Signal Binding (SPEC_FULL §6.4 / distilled spec §4.3).
//!
//! Grounds the preemption tick in the original's `sigaction`/`setitimer`
//! pair: a `SIGVTALRM` handler installed once at `init`, and an interval
//! timer rearmed with the same quantum length every time a thread gives
//! up the CPU, whether by preemption or by voluntarily yielding.

use crate::error::FatalError;

/// The signal this library multiplexes the CPU on. Virtual time (process
/// CPU time only) rather than real time, so a sleeping process doesn't
/// burn through another process's quanta.
const PREEMPT_SIGNAL: libc::c_int = libc::SIGVTALRM;

fn preempt_sigset() -> libc::sigset_t {
    // SAFETY: sigset_t is POD; sigemptyset/sigaddset only write through
    // the pointer we own.
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, PREEMPT_SIGNAL);
        set
    }
}

/// Block `SIGVTALRM` for the calling thread. Used to bracket the critical
/// sections described in distilled spec §5: every state mutation to the
/// scheduler singleton happens with the signal blocked, so the handler
/// can never interleave with a half-finished update.
pub(crate) fn block() -> Result<(), FatalError> {
    let set = preempt_sigset();
    // SAFETY: valid sigset_t, no old-set pointer requested.
    let rc = unsafe { libc::sigprocmask(libc::SIG_BLOCK, &set, std::ptr::null_mut()) };
    if rc == 0 {
        Ok(())
    } else {
        Err(FatalError::SigMaskFail)
    }
}

/// Unblock `SIGVTALRM`. Called at the end of every critical section, and
/// — critically — the instant before a context switch, so the saved
/// context for the outgoing thread records an unmasked signal mask
/// (distilled spec §4.3: "the only place the mask is dropped is
/// immediately before the switch").
pub(crate) fn unblock() -> Result<(), FatalError> {
    let set = preempt_sigset();
    // SAFETY: valid sigset_t, no old-set pointer requested.
    let rc = unsafe { libc::sigprocmask(libc::SIG_UNBLOCK, &set, std::ptr::null_mut()) };
    if rc == 0 {
        Ok(())
    } else {
        Err(FatalError::SigMaskFail)
    }
}

/// RAII guard pairing `block`/`unblock` around a scope. Most of the API
/// layer's critical sections fit this shape; the scheduler core's
/// context-switch path manages masking by hand instead, since it must
/// unblock *before* returning rather than on drop.
pub(crate) struct CriticalSection;

impl CriticalSection {
    pub(crate) fn enter() -> Result<Self, FatalError> {
        block()?;
        Ok(CriticalSection)
    }
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        if let Err(err) = unblock() {
            crate::error::fail(err);
        }
    }
}

/// Install the SIGVTALRM handler. Called once, from `init`.
pub(crate) fn install_handler() -> Result<(), FatalError> {
    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    action.sa_sigaction = handle_preemption_signal as usize;
    // SAFETY: valid sigset_t.
    unsafe { libc::sigemptyset(&mut action.sa_mask) };
    action.sa_flags = 0;

    // SAFETY: `action` is fully initialized; no previous-action pointer
    // requested.
    let rc = unsafe { libc::sigaction(PREEMPT_SIGNAL, &action, std::ptr::null_mut()) };
    if rc == 0 {
        Ok(())
    } else {
        Err(FatalError::SigActionFail)
    }
}

/// Arm (or rearm) the virtual interval timer for `quantum_usecs`, both
/// the initial delay and the recurring interval. Rearmed every time a
/// thread voluntarily gives up the CPU, so each thread always gets a
/// full quantum rather than the remainder of the previous one
/// (distilled spec §4.3).
pub(crate) fn arm(quantum_usecs: u64) -> Result<(), FatalError> {
    let interval = libc::timeval {
        tv_sec: (quantum_usecs / 1_000_000) as libc::time_t,
        tv_usec: (quantum_usecs % 1_000_000) as libc::suseconds_t,
    };
    let timer = libc::itimerval {
        it_interval: interval,
        it_value: interval,
    };
    // SAFETY: valid itimerval, no old-value pointer requested.
    let rc = unsafe { libc::setitimer(libc::ITIMER_VIRTUAL, &timer, std::ptr::null_mut()) };
    if rc == 0 {
        Ok(())
    } else {
        Err(FatalError::TimerFail)
    }
}

extern "C" fn handle_preemption_signal(_sig: libc::c_int) {
    crate::scheduler::on_preemption_signal();
}
