//! Error taxonomy for the library's public surface (SPEC_FULL §7).
//!
//! Two separate enums mirror the spec's two failure classes: [`Error`] for
//! the caller-recoverable conditions each API entry point can return, and
//! [`FatalError`] for host-primitive failures (signal masking, timer
//! arming, context capture) that the spec says have no recovery path.

use thiserror::Error;

/// A recoverable misuse of the public API. Every one of these is returned
/// to the caller as `Err`; none of them panics or aborts the process.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("quantum length must be a positive number of microseconds")]
    BadQuantum,

    #[error("spawn entry point must not be null")]
    NullEntry,

    #[error("no free thread id available (at most {0} threads may exist at once)")]
    OutOfTids(usize),

    #[error("no thread with id {0} exists")]
    NoSuchTid(usize),

    #[error("the main thread (tid 0) cannot be blocked, resumed, or put to sleep")]
    MainThreadRestricted,

    #[error("the library has not been initialized")]
    NotInitialized,

    #[error("the library has already been initialized")]
    AlreadyInitialized,
}

/// A failure in a host primitive the library depends on: masking signals,
/// arming the interval timer, installing the handler, or capturing a
/// context. SPEC_FULL §7 treats these as unrecoverable — the process
/// can no longer guarantee its scheduling invariants, so library code
/// reports the failure and exits rather than continuing in an unknown
/// state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FatalError {
    #[error("failed to block or unblock the preemption signal")]
    SigMaskFail,

    #[error("failed to arm the virtual interval timer")]
    TimerFail,

    #[error("failed to install the preemption signal handler")]
    SigActionFail,

    #[error("failed to allocate or install a thread's execution context")]
    AllocFail,
}

/// Report a fatal host-primitive failure and terminate the process.
///
/// Mirrors the original assignment's `system error` convention: print to
/// stderr and `exit(1)`, rather than unwinding through a signal handler
/// where panicking would be undefined behavior.
pub(crate) fn fail(err: FatalError) -> ! {
    eprintln!("system error: {err}");
    std::process::exit(1);
}

/// Report a recoverable user error to stderr with the protocol-mandated
/// prefix (§6/§7) and hand the same error back to the caller. Every public
/// API function routes its `Err` path through this so a caller that only
/// checks the return code still gets the required diagnostic.
pub(crate) fn report(err: Error) -> Error {
    eprintln!("thread library error: {err}");
    err
}
