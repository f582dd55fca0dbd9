//! Computed Implementation
//!
//! A Computed is a memoized derived value that re-evaluates lazily.
//!
//! # How Computeds Work
//!
//! 1. Construction stores the computation and nothing else.
//!
//! 2. The first read evaluates it inside a fresh tracking frame, wraps the
//!    result in an inner [`Reactive`], and subscribes the computed to every
//!    source the evaluation read.
//!
//! 3. When one of those sources changes, propagation only flips the
//!    computed's dirty flag (and dirties whatever reads the computed in
//!    turn). Nothing is evaluated.
//!
//! 4. The next read sees the flag, evaluates again and writes the result
//!    into the inner source. That write goes through the normal
//!    [`SameValue`] check, so readers of the computed are only disturbed
//!    when the result actually changed.
//!
//! 5. Every read finishes by reading the inner source, which is how a
//!    computed becomes a dependency of whatever is reading it.
//!
//! # Failure
//!
//! If the computation panics, the node is left as it was before the read:
//! an unestablished computed stays unestablished and a dirty one stays
//! dirty, so the next read tries again.

use std::cell::{Cell, OnceCell};
use std::fmt::{self, Debug, Display};
use std::rc::{Rc, Weak};

use serde::{Serialize, Serializer};

use super::context::{self, TrackingScope};
use super::equality::SameValue;
use super::signal::Signal;
use super::source::Reactive;
use crate::error::{Result, SignalError};
use crate::graph::{Dependent, DerivedNode, NodeId, NodeKind, SubscriberSet};

struct ComputedNode<T> {
    id: NodeId,
    compute: Box<dyn Fn() -> T>,
    dirty: Cell<bool>,
    memo: OnceCell<Reactive<T>>,
}

impl<T: SameValue + 'static> ComputedNode<T> {
    /// Bring the memoized value up to date and return the source holding it.
    fn refresh(self: &Rc<Self>) -> &Reactive<T> {
        if let Some(memo) = self.memo.get() {
            if self.dirty.get() {
                let value = self.evaluate();
                self.dirty.set(false);
                let stale = RedirtyOnUnwind {
                    dirty: &self.dirty,
                    armed: true,
                };
                memo.set(value);
                stale.disarm();
            }
            return memo;
        }

        let value = self.evaluate();
        self.memo.get_or_init(|| Reactive::new(value))
    }

    fn evaluate(self: &Rc<Self>) -> T {
        let scope = TrackingScope::enter(self.id);
        let value = (self.compute)();
        let sources = scope.finish();

        let weak: Weak<dyn DerivedNode> = Rc::downgrade(self) as Weak<dyn DerivedNode>;
        context::subscribe_all(sources, self.id, &Dependent::Derived(weak));
        value
    }
}

/// Puts the dirty flag back if writing the memo unwinds, so the next read
/// recomputes instead of trusting a value that may not have been stored.
struct RedirtyOnUnwind<'a> {
    dirty: &'a Cell<bool>,
    armed: bool,
}

impl RedirtyOnUnwind<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RedirtyOnUnwind<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.dirty.set(true);
        }
    }
}

impl<T> DerivedNode for ComputedNode<T> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    fn downstream(&self) -> Option<Rc<SubscriberSet>> {
        self.memo.get().map(Reactive::subscribers)
    }
}

/// A read-only, lazily memoized value derived from other nodes.
///
/// Cloning the handle shares the same node. The node lives as long as one
/// handle does; the sources it reads only hold it weakly.
///
/// # Example
///
/// ```rust
/// use rivulet_core::{computed, signal};
///
/// let count = signal(2);
/// let doubled = computed({
///     let count = count.clone();
///     move || count.get() * 2
/// });
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Computed<T> {
    node: Rc<ComputedNode<T>>,
}

/// Create a computed from `f`. `f` is not called until the first read.
pub fn computed<T, F>(f: F) -> Computed<T>
where
    T: SameValue + 'static,
    F: Fn() -> T + 'static,
{
    Computed::new(f)
}

impl<T: SameValue + 'static> Computed<T> {
    /// Create a new computed with the given computation function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self {
            node: Rc::new(ComputedNode {
                id: NodeId::new(),
                compute: Box::new(f),
                dirty: Cell::new(false),
                memo: OnceCell::new(),
            }),
        }
    }

    /// Borrow the up-to-date value, registering a dependency.
    ///
    /// # Panics
    ///
    /// The memoized value stays borrowed while `f` runs. If `f` writes to a
    /// source this computed depends on, and something reads the computed
    /// again before `f` returns (a sync effect, typically), storing the new
    /// value panics. The computed is left dirty and recomputes on its next
    /// read. Use [`get`](Self::get) to read a copy instead.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.node.refresh().with(f)
    }
}

impl<T: Clone + SameValue + 'static> Computed<T> {
    /// Get the up-to-date value, evaluating if this is the first read or a
    /// dependency changed since the last one.
    pub fn get(&self) -> T {
        self.node.refresh().get()
    }

    /// Get the up-to-date value without registering a dependency.
    pub fn peek(&self) -> T {
        self.node.refresh().peek()
    }
}

impl<T> Computed<T> {
    /// Get the computed's unique ID.
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Whether a dependency changed since the value was last evaluated.
    pub fn is_dirty(&self) -> bool {
        self.node.dirty.get()
    }

    /// Whether the computation has run at least once.
    pub fn is_established(&self) -> bool {
        self.node.memo.get().is_some()
    }

    /// Number of live nodes reading this computed.
    pub fn subscriber_count(&self) -> usize {
        self.node
            .memo
            .get()
            .map(Reactive::subscriber_count)
            .unwrap_or(0)
    }
}

impl<T: Clone + SameValue + 'static> Signal<T> for Computed<T> {
    fn id(&self) -> NodeId {
        self.node.id
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Derived
    }

    fn get(&self) -> T {
        Computed::get(self)
    }

    fn try_set(&self, _value: T) -> Result<()> {
        Err(SignalError::InvalidMutation {
            kind: NodeKind::Derived,
        })
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: Display + SameValue + 'static> Display for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with(|value| Display::fmt(value, f))
    }
}

impl<T: Serialize + SameValue + 'static> Serialize for Computed<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.with(|value| value.serialize(serializer))
    }
}

impl<T> Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.node.id)
            .field("dirty", &self.is_dirty())
            .field("established", &self.is_established())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
