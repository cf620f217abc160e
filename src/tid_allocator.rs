//! Tid Allocator (SPEC_FULL §6.1 / distilled spec §4.1).
//!
//! Hands out the smallest currently-free id, tid 0 reserved for the main
//! thread. Grounded on the original's `priority_queue<int, vector<int>,
//! greater<int>>` of free ids: a min-heap gives "smallest free id first"
//! without scanning, and reuse falls naturally out of pushing a
//! terminated thread's id back in.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::config::{Tid, MAX_THREADS};
use crate::error::Error;

pub(crate) struct TidAllocator {
    free: BinaryHeap<Reverse<Tid>>,
}

impl TidAllocator {
    /// All ids from 1..MAX_THREADS are free; tid 0 is reserved for the
    /// caller to assign to the main thread directly.
    pub(crate) fn new() -> Self {
        TidAllocator {
            free: (1..MAX_THREADS).map(Reverse).collect(),
        }
    }

    /// Smallest free id, or `OutOfTids` if every slot is in use.
    pub(crate) fn acquire(&mut self) -> Result<Tid, Error> {
        self.free
            .pop()
            .map(|Reverse(tid)| tid)
            .ok_or(Error::OutOfTids(MAX_THREADS))
    }

    /// Return `tid` to the free pool. Callers must not release a tid that
    /// is still in use; the allocator trusts its caller on this, same as
    /// the original's free-list.
    pub(crate) fn release(&mut self, tid: Tid) {
        self.free.push(Reverse(tid));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hands_out_smallest_free_id_first() {
        let mut a = TidAllocator::new();
        assert_eq!(a.acquire().unwrap(), 1);
        assert_eq!(a.acquire().unwrap(), 2);
        assert_eq!(a.acquire().unwrap(), 3);
    }

    #[test]
    fn released_id_is_reused_before_larger_ids() {
        let mut a = TidAllocator::new();
        let t1 = a.acquire().unwrap();
        let _t2 = a.acquire().unwrap();
        let t3 = a.acquire().unwrap();
        a.release(t1);
        assert_eq!(a.acquire().unwrap(), t1);
        assert_ne!(t1, t3);
    }

    #[test]
    fn exhaustion_reports_out_of_tids() {
        let mut a = TidAllocator::new();
        for _ in 1..MAX_THREADS {
            a.acquire().unwrap();
        }
        assert_eq!(a.acquire(), Err(Error::OutOfTids(MAX_THREADS)));
    }

    proptest::proptest! {
        /// Whatever sequence of acquire/release we replay, the allocator
        /// never hands out a tid that's already outstanding, and never
        /// hands out anything outside 1..MAX_THREADS.
        #[test]
        fn never_double_allocates(ops in proptest::collection::vec(proptest::bool::ANY, 0..500)) {
            let mut a = TidAllocator::new();
            let mut outstanding = std::collections::HashSet::new();
            for acquire in ops {
                if acquire || outstanding.is_empty() {
                    if let Ok(tid) = a.acquire() {
                        prop_assert!(tid >= 1 && tid < MAX_THREADS);
                        prop_assert!(outstanding.insert(tid), "tid {} handed out twice", tid);
                    }
                } else {
                    let tid = *outstanding.iter().next().unwrap();
                    outstanding.remove(&tid);
                    a.release(tid);
                }
            }
        }
    }
}
