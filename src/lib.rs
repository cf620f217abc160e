//! uthreads: a user-level thread library.
//!
//! Round-robins a fixed number of green threads inside a single POSIX
//! process, preempting the running thread with a `SIGVTALRM`-driven
//! virtual interval timer and context-switching between them with
//! `ucontext_t`. See `SPEC_FULL.md` in the repository root for the full
//! design; this module only re-exports the public API.
//!
//! ```no_run
//! uthreads::init(100_000).unwrap();
//! let tid = uthreads::spawn(Some(my_thread)).unwrap();
//! extern "C" fn my_thread() {
//!     println!("hello from a green thread");
//!     uthreads::terminate(uthreads::current_thread_id().unwrap()).unwrap();
//! }
//! # let _ = tid;
//! ```

mod api;
mod config;
mod context;
mod error;
mod ready_queue;
mod scheduler;
mod sleep_set;
mod table;
mod thread;
mod tid_allocator;
mod timer;

pub use api::{
    block_thread, current_thread_id, init, resume_thread, sleep, spawn, terminate,
    thread_quantums, total_quantums, yield_now,
};
pub use config::{Tid, MAX_THREADS, STACK_SIZE};
pub use context::EntryPoint;
pub use error::{Error, FatalError};
