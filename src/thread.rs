//! Thread descriptors (SPEC_FULL §6.2 / distilled spec §4.2).
//!
//! Grounded on `src/scheduler/thread.rs` of the teacher repo for the
//! shape of a descriptor (id, state, accounting fields) and its
//! `ThreadState` enum, generalized from a preemptible-kernel-task model
//! to a green thread with its own heap-allocated stack and ucontext.

use crate::config::Tid;
use crate::context::{Context, EntryPoint};
use crate::error::FatalError;

/// A thread's scheduling state (distilled spec §3 data model).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ThreadState {
    Ready,
    Running,
    Blocked,
}

/// Everything the scheduler tracks about one thread. Lives in the
/// [`crate::table::ThreadTable`] for its whole lifetime, from `spawn`
/// (or `init`, for tid 0) to `terminate`.
pub(crate) struct ThreadDescriptor {
    pub(crate) tid: Tid,
    pub(crate) state: ThreadState,
    /// Number of quanta during which this thread was the running thread,
    /// incremented once per dispatch onto it (distilled spec §4.2).
    pub(crate) quantums_run: u64,
    /// Set by `sleep`; the thread is eligible to move to Ready once
    /// `total_quantums` reaches this value. `None` when not sleeping.
    pub(crate) wake_at: Option<u64>,
    /// Set by `block_thread`, cleared by `resume_thread`, independent of
    /// `wake_at`: a thread can be asleep and explicitly blocked at once,
    /// in which case it stays Blocked past its wake-up quantum until
    /// resumed (distilled spec §8, "sleep while blocked").
    pub(crate) user_blocked: bool,
    pub(crate) context: Context,
    /// `None` for the main thread, which runs on the process's own stack.
    #[allow(dead_code)]
    stack: Option<Box<[u8]>>,
}

impl ThreadDescriptor {
    /// The main thread's descriptor: tid 0, immediately Running, no
    /// allocated stack, context populated lazily by the first
    /// `getcontext` call the scheduler performs on it.
    pub(crate) fn main(tid: Tid) -> Self {
        ThreadDescriptor {
            tid,
            state: ThreadState::Running,
            quantums_run: 1,
            wake_at: None,
            user_blocked: false,
            context: Context::empty(),
            stack: None,
        }
    }

    /// A freshly spawned thread: Ready, zero quanta run, context installed
    /// to start at `entry` on a newly allocated stack.
    pub(crate) fn spawned(tid: Tid, entry: EntryPoint) -> Result<Self, FatalError> {
        let mut stack = vec![0u8; crate::config::STACK_SIZE].into_boxed_slice();
        let context = Context::install_entry(&mut stack, entry)?;
        Ok(ThreadDescriptor {
            tid,
            state: ThreadState::Ready,
            quantums_run: 0,
            wake_at: None,
            user_blocked: false,
            context,
            stack: Some(stack),
        })
    }
}
