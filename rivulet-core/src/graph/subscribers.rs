//! Subscriber sets.
//!
//! Every source owns one of these. It maps dependent ids to weak references,
//! so registering the same dependent twice is a no-op and a dropped dependent
//! leaves only a dead entry behind, removed the next time a walk reaches it.

use std::cell::RefCell;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use super::node::{Dependent, NodeId};

/// Inline capacity of a walk snapshot. Most sources have a handful of readers.
pub(crate) type Snapshot = SmallVec<[(NodeId, Dependent); 8]>;

/// The weak dependents of a single source.
#[derive(Debug)]
pub(crate) struct SubscriberSet {
    source: NodeId,
    entries: RefCell<IndexMap<NodeId, Dependent>>,
}

impl SubscriberSet {
    pub(crate) fn new(source: NodeId) -> Self {
        Self {
            source,
            entries: RefCell::new(IndexMap::new()),
        }
    }

    /// The id of the source owning this set.
    pub(crate) fn source(&self) -> NodeId {
        self.source
    }

    /// Register a dependent. Returns `false` if it was already present.
    pub(crate) fn insert(&self, id: NodeId, dependent: Dependent) -> bool {
        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(&id) {
            return false;
        }
        trace!(source = %self.source, dependent = %id, kind = %dependent.kind(), "subscribed");
        entries.insert(id, dependent);
        true
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.entries.borrow().contains_key(&id)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Number of entries, dead or alive.
    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Copy the entries out so the walk can recurse without holding a borrow.
    pub(crate) fn snapshot(&self) -> Snapshot {
        self.entries
            .borrow()
            .iter()
            .map(|(id, dependent)| (*id, dependent.clone()))
            .collect()
    }

    /// Drop every entry whose node is gone or stopped, in one pass, keeping
    /// the order of the rest. Returns how many were removed.
    pub(crate) fn prune_dead(&self) -> usize {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|_, dependent| dependent.is_live());
        let pruned = before - entries.len();
        if pruned > 0 {
            trace!(source = %self.source, pruned, "pruned collected subscribers");
        }
        pruned
    }

    /// Prune every dead entry and report how many remain.
    pub(crate) fn live_count(&self) -> usize {
        self.prune_dead();
        self.entries.borrow().len()
    }
}
