/*
 * Context save/restore — the external primitive from SPEC_FULL §6.4
 *
 * The spec treats "capture the CPU state into an opaque buffer, later
 * resume from it" as an opaque host-provided service. On a POSIX host that
 * service is the `ucontext_t` family: getcontext/makecontext/swapcontext.
 * This module is the one place in the crate that talks to it directly;
 * everything above this line works with `Context` values and never sees a
 * `ucontext_t`.
 */

use std::mem::MaybeUninit;

use crate::error::FatalError;

/// One thread's saved CPU state: stack pointer, program counter,
/// callee-saved registers, and signal mask, exactly as SPEC_FULL §3
/// describes it. Opaque to everyone outside this module.
pub(crate) struct Context(libc::ucontext_t);

impl Context {
    /// A context with no captured state yet. Only valid as a write target
    /// for `capture` or `install_entry`.
    pub(crate) fn empty() -> Self {
        // SAFETY: ucontext_t is a plain-old-data struct; a zeroed value is
        // never read before `getcontext`/`makecontext` fills it in.
        Context(unsafe { MaybeUninit::zeroed().assume_init() })
    }

    fn as_mut_ptr(&mut self) -> *mut libc::ucontext_t {
        &mut self.0
    }

    fn as_ptr(&self) -> *const libc::ucontext_t {
        &self.0
    }

    /// Build a context for a freshly spawned thread: `entry` runs on
    /// `stack`, with the preemption signal unmasked (§4.3 — new threads,
    /// like resumed ones, always start life outside the critical section).
    pub(crate) fn install_entry(
        stack: &mut [u8],
        entry: EntryPoint,
    ) -> Result<Self, FatalError> {
        let mut ctx = Self::empty();

        // SAFETY: `ctx.0` is a valid, owned ucontext_t; getcontext only
        // writes through the pointer.
        if unsafe { libc::getcontext(ctx.as_mut_ptr()) } != 0 {
            return Err(FatalError::AllocFail);
        }

        ctx.0.uc_stack.ss_sp = stack.as_mut_ptr().cast();
        ctx.0.uc_stack.ss_size = stack.len();
        ctx.0.uc_stack.ss_flags = 0;
        ctx.0.uc_link = std::ptr::null_mut();
        // SAFETY: sigset_t is POD; emptying it is always well-defined.
        unsafe { libc::sigemptyset(&mut ctx.0.uc_sigmask) };

        let addr = entry as usize as u64;
        let hi = (addr >> 32) as u32;
        let lo = (addr & 0xffff_ffff) as u32;

        // SAFETY: the stack is large enough for any reasonable call depth
        // (STACK_SIZE, sized by the caller); `trampoline` takes exactly the
        // two ints we pass, matching the varargs contract of makecontext.
        unsafe {
            libc::makecontext(
                ctx.as_mut_ptr(),
                std::mem::transmute::<extern "C" fn(u32, u32), extern "C" fn()>(trampoline),
                2,
                hi,
                lo,
            );
        }

        Ok(ctx)
    }

    /// Save the calling thread's state into `out`, then transfer control
    /// into `into`. Returns once some later call resumes `out` — i.e. this
    /// call has the same "returns twice" shape SPEC_FULL §9 describes for
    /// the abstract capture/restore primitive, except here a single
    /// `swapcontext` call does both halves atomically.
    ///
    /// # Safety
    /// `out` and `into` must be distinct descriptors' contexts, both
    /// currently live in the thread table; `into` must have been produced
    /// by `install_entry` or by a previous `swap_into`.
    pub(crate) unsafe fn swap_into(out: *mut Context, into: *const Context) -> Result<(), FatalError> {
        if libc::swapcontext((*out).as_mut_ptr(), (*into).as_ptr()) != 0 {
            return Err(FatalError::AllocFail);
        }
        Ok(())
    }

    /// Transfer control into `into` without saving the caller's state.
    /// Used on the terminate-self path, where the outgoing descriptor is
    /// being destroyed and there is nothing to resume later.
    ///
    /// # Safety
    /// `into` must be a live, previously captured context. Never returns.
    pub(crate) unsafe fn set_into(into: *const Context) -> ! {
        libc::setcontext(into.cast::<libc::ucontext_t>());
        // setcontext only returns on failure; the library has no
        // recovery path if the saved context it captured itself is bad.
        unreachable!("setcontext returned");
    }
}

/// A spawned thread's entry point. `None` stands in for the null entry
/// point the original C contract forbids (`NullEntry`); Rust's `fn()`
/// cannot itself be null, so the nullability lives in the `Option`.
pub type EntryPoint = extern "C" fn();

/// The function every spawned context actually starts at. Unpacks the
/// entry point passed through makecontext's two-int varargs, runs it, and
/// terminates the calling thread if it ever returns — mirroring what a
/// thread that falls off the end of its own `main` is expected to do.
extern "C" fn trampoline(hi: u32, lo: u32) {
    let addr = ((hi as u64) << 32) | lo as u64;
    // SAFETY: `addr` was produced from a real `EntryPoint` in `install_entry`.
    let entry: EntryPoint = unsafe { std::mem::transmute(addr as usize) };
    entry();
    crate::scheduler::terminate_self_from_trampoline();
}
