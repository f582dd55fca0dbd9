//! Reactive Context
//!
//! The reactive context records which sources are read while a computed or
//! effect evaluates. This enables automatic dependency tracking: reading a
//! source inside an open context adds the source to that context's tracking
//! set, and once evaluation finishes the node subscribes to every source it
//! collected.
//!
//! # Implementation
//!
//! We use a thread-local stack of tracking frames. Evaluating a node pushes a
//! frame and pops it afterwards, so a computed that reads another computed
//! establishes the inner one in its own frame and only the inner node's
//! memoized value lands in the outer frame. [`untrack`] pushes a frame that
//! records nothing.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use crate::graph::{Dependent, NodeId, SubscriberSet};

/// Sources collected by one evaluation, keyed by source id.
pub(crate) type TrackingSet = IndexMap<NodeId, Rc<SubscriberSet>>;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
#[derive(Debug)]
struct ContextEntry {
    /// The node being evaluated. `None` for an untracked frame.
    owner: Option<NodeId>,
    /// Sources read so far. Insertion is idempotent.
    sources: TrackingSet,
}

/// Guard that pops the frame when dropped.
///
/// This keeps the stack balanced even if the computation panics.
pub(crate) struct TrackingScope {
    owner: Option<NodeId>,
    finished: bool,
}

impl TrackingScope {
    /// Open a tracking frame for `owner`.
    pub(crate) fn enter(owner: NodeId) -> Self {
        Self::push(Some(owner))
    }

    /// Open a frame in which reads are not recorded.
    pub(crate) fn untracked() -> Self {
        Self::push(None)
    }

    fn push(owner: Option<NodeId>) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                owner,
                sources: TrackingSet::new(),
            });
        });
        Self {
            owner,
            finished: false,
        }
    }

    /// Close the frame and hand back the sources it collected.
    pub(crate) fn finish(mut self) -> TrackingSet {
        self.finished = true;
        self.pop().map(|entry| entry.sources).unwrap_or_default()
    }

    fn pop(&self) -> Option<ContextEntry> {
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());
        if let Some(entry) = &popped {
            debug_assert_eq!(
                entry.owner, self.owner,
                "TrackingScope mismatch: expected {:?}, got {:?}",
                self.owner, entry.owner
            );
        }
        popped
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        if !self.finished {
            self.pop();
        }
    }
}

/// Whether reads on this thread are currently being recorded.
pub fn is_tracking() -> bool {
    CONTEXT_STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .map(|entry| entry.owner.is_some())
            .unwrap_or(false)
    })
}

/// Run `f` without recording any of the reads it performs.
///
/// ```rust
/// use rivulet_core::{computed, signal, untrack};
///
/// let a = signal(1);
/// let b = signal(10);
/// let sum = computed({
///     let (a, b) = (a.clone(), b.clone());
///     move || a.get() + untrack(|| b.get())
/// });
/// assert_eq!(sum.get(), 11);
///
/// b.set(20);
/// assert!(!sum.is_dirty());
/// ```
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _scope = TrackingScope::untracked();
    f()
}

/// Record a read of the source owning `subscribers` in the innermost frame.
pub(crate) fn track(subscribers: &Rc<SubscriberSet>) {
    CONTEXT_STACK.with(|stack| {
        if let Some(entry) = stack.borrow_mut().last_mut() {
            if entry.owner.is_some() {
                entry
                    .sources
                    .entry(subscribers.source())
                    .or_insert_with(|| Rc::clone(subscribers));
            }
        }
    });
}

/// Subscribe `dependent` to every source in `sources`.
pub(crate) fn subscribe_all(sources: TrackingSet, id: NodeId, dependent: &Dependent) {
    let mut added = 0usize;
    for subscribers in sources.values() {
        if subscribers.insert(id, dependent.clone()) {
            added += 1;
        }
    }
    if added > 0 {
        trace!(node = %id, added, total = sources.len(), "dependencies recorded");
    }
}
