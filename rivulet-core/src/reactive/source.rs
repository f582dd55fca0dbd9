//! Reactive Sources
//!
//! A [`Reactive`] is the writable root of the graph. It holds a value and
//! the weak set of nodes that read it.
//!
//! # How Sources Work
//!
//! 1. Reading the value inside a computed or effect evaluation records the
//!    source in that evaluation's tracking set. Outside one, a read has no
//!    side effects.
//!
//! 2. Writing compares the new value to the current one with
//!    [`SameValue`]. An identical value is dropped on the floor.
//!
//! 3. A changed value is stored, then the subscriber set is walked: derived
//!    readers are dirtied, effect readers are scheduled and run.
//!
//! # Memory
//!
//! The subscriber set holds weak references only. A source never keeps a
//! reader alive, and a reader that goes away is pruned the next time a
//! write walks past it.

use std::cell::RefCell;
use std::fmt::{self, Debug, Display};
use std::rc::Rc;

use serde::{Serialize, Serializer};

use super::context;
use super::equality::SameValue;
use super::signal::Signal;
use crate::error::Result;
use crate::graph::{self, NodeId, NodeKind, SubscriberSet};

struct SourceNode<T> {
    value: RefCell<T>,
    subscribers: Rc<SubscriberSet>,
}

/// A writable reactive value.
///
/// Cloning the handle shares the same source.
///
/// # Example
///
/// ```rust
/// use rivulet_core::signal;
///
/// let count = signal(0);
/// assert_eq!(count.get(), 0);
///
/// count.set(5);
/// assert_eq!(count.get(), 5);
///
/// count.update(|n| n + 1);
/// assert_eq!(count.peek(), 6);
/// ```
pub struct Reactive<T> {
    node: Rc<SourceNode<T>>,
}

/// Create a writable source holding `value`.
pub fn signal<T: SameValue + 'static>(value: T) -> Reactive<T> {
    Reactive::new(value)
}

impl<T> Reactive<T> {
    /// Create a new source with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            node: Rc::new(SourceNode {
                value: RefCell::new(value),
                subscribers: Rc::new(SubscriberSet::new(NodeId::new())),
            }),
        }
    }

    /// Get the source's unique ID.
    pub fn id(&self) -> NodeId {
        self.node.subscribers.source()
    }

    /// Borrow the current value, registering a dependency.
    ///
    /// # Panics
    ///
    /// The borrow is held while `f` runs. If `f` writes to this source,
    /// directly or through an effect it triggers, the write panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        context::track(&self.node.subscribers);
        f(&self.node.value.borrow())
    }

    /// Borrow the current value without registering a dependency.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.node.value.borrow())
    }

    /// Number of live dependents. Dead entries are pruned while counting.
    pub fn subscriber_count(&self) -> usize {
        self.node.subscribers.live_count()
    }

    /// Whether `other` is a handle to the same source.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    pub(crate) fn subscribers(&self) -> Rc<SubscriberSet> {
        Rc::clone(&self.node.subscribers)
    }

    #[cfg(test)]
    pub(crate) fn is_subscribed(&self, id: NodeId) -> bool {
        self.node.subscribers.contains(id)
    }
}

impl<T: Clone> Reactive<T> {
    /// Get the current value.
    ///
    /// If called while a computed or effect is evaluating, this source
    /// becomes one of its dependencies.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without registering a dependency.
    pub fn peek(&self) -> T {
        self.node.value.borrow().clone()
    }
}

impl<T: SameValue> Reactive<T> {
    /// Set a new value and propagate the change.
    ///
    /// Writing a value that is the same as the current one does nothing.
    ///
    /// # Panics
    ///
    /// Panics if the value is currently borrowed by [`with`](Self::with).
    pub fn set(&self, value: T) {
        if self.node.value.borrow().same_value(&value) {
            return;
        }
        match self.node.value.try_borrow_mut() {
            Ok(mut slot) => *slot = value,
            Err(_) => panic!(
                "source {} written while a `with` borrow of its value is held",
                self.id()
            ),
        }
        graph::propagate(&self.node.subscribers);
    }

    /// Replace the value with `f(&current)`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.node.value.borrow());
        self.set(next);
    }
}

impl<T: Clone + SameValue> Signal<T> for Reactive<T> {
    fn id(&self) -> NodeId {
        Reactive::id(self)
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Source
    }

    fn get(&self) -> T {
        Reactive::get(self)
    }

    fn try_set(&self, value: T) -> Result<()> {
        self.set(value);
        Ok(())
    }
}

impl<T> Clone for Reactive<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: Default> Default for Reactive<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Display> Display for Reactive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with(|value| Display::fmt(value, f))
    }
}

impl<T: Serialize> Serialize for Reactive<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.with(|value| value.serialize(serializer))
    }
}

impl<T: Debug> Debug for Reactive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("id", &self.id())
            .field("value", &*self.node.value.borrow())
            .field("subscribers", &self.node.subscribers.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
