//! Sleep Set (SPEC_FULL §6.3 / distilled spec §4.2).
//!
//! Tracks which tids are currently sleeping; the wake-up time itself
//! lives on the thread's own descriptor (`ThreadDescriptor::wake_at`), so
//! this is membership only, grounded on the original's flat `vector<int>
//! sleeping` scanned once per quantum in `timer_handler`.

use std::collections::HashSet;

use crate::config::Tid;

#[derive(Default)]
pub(crate) struct SleepSet(HashSet<Tid>);

impl SleepSet {
    pub(crate) fn new() -> Self {
        SleepSet(HashSet::new())
    }

    pub(crate) fn insert(&mut self, tid: Tid) {
        self.0.insert(tid);
    }

    pub(crate) fn remove(&mut self, tid: Tid) -> bool {
        self.0.remove(&tid)
    }

    /// All currently sleeping tids, in no particular order; the caller
    /// decides which have reached their wake-up time.
    pub(crate) fn iter(&self) -> impl Iterator<Item = Tid> + '_ {
        self.0.iter().copied()
    }
}
