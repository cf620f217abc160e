//! Crate-wide constants (SPEC_FULL §3, §6.1).

/// Upper bound on live thread ids, including the main thread (tid 0).
/// Mirrors the original assignment's `MAX_THREAD_NUM`.
pub const MAX_THREADS: usize = 100;

/// Stack size, in bytes, allocated for every spawned thread. The main
/// thread uses the process's own stack and never allocates one of these.
pub const STACK_SIZE: usize = 64 * 1024;

/// A thread id. Ids are small non-negative integers handed out by the
/// [`crate::tid_allocator::TidAllocator`] and reused once freed.
pub type Tid = usize;

/// The reserved id of the thread created implicitly by [`crate::init`].
pub const MAIN_TID: Tid = 0;
