//! Graph Nodes
//!
//! This module defines node identity, the closed set of node kinds, and the
//! non-owning back-references a source keeps to the nodes that read it.

use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::subscribers::SubscriberSet;
use crate::reactive::EffectNode;

/// Unique identifier for a node in the dependency graph.
///
/// Identifiers are never reused, so a stale id left behind in a subscriber
/// set can never alias a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A writable source. Sources have dependents but no dependencies.
    Source,

    /// A lazily memoized derived value. It is marked dirty by propagation
    /// and recomputes on its next read.
    Derived,

    /// An active subscriber. It is scheduled to run as soon as the wave
    /// that dirtied it is flushed.
    Effect,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Source => "source",
            NodeKind::Derived => "computed",
            NodeKind::Effect => "effect",
        };
        f.write_str(name)
    }
}

/// What the propagation walk needs from a derived node, independent of the
/// type of value it memoizes.
pub(crate) trait DerivedNode {
    fn id(&self) -> NodeId;

    fn is_dirty(&self) -> bool;

    fn mark_dirty(&self);

    /// Subscribers of the node's memoized value, once it has been
    /// established.
    fn downstream(&self) -> Option<Rc<SubscriberSet>>;
}

/// A non-owning back-reference from a source to one of its dependents.
#[derive(Clone)]
pub(crate) enum Dependent {
    Derived(Weak<dyn DerivedNode>),
    Effect(Weak<EffectNode>),
}

/// A dependent whose node is still alive.
pub(crate) enum LiveDependent {
    Derived(Rc<dyn DerivedNode>),
    Effect(Rc<EffectNode>),
}

impl Dependent {
    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Dependent::Derived(_) => NodeKind::Derived,
            Dependent::Effect(_) => NodeKind::Effect,
        }
    }

    /// Resolve the reference. Returns `None` once the node has been dropped.
    pub(crate) fn upgrade(&self) -> Option<LiveDependent> {
        match self {
            Dependent::Derived(weak) => weak.upgrade().map(LiveDependent::Derived),
            Dependent::Effect(weak) => weak.upgrade().map(LiveDependent::Effect),
        }
    }

    /// Whether the node is still alive and able to react.
    ///
    /// A stopped effect counts as gone: it can never run again.
    pub(crate) fn is_live(&self) -> bool {
        match self {
            Dependent::Derived(weak) => weak.strong_count() > 0,
            Dependent::Effect(weak) => weak
                .upgrade()
                .map(|effect| !effect.is_stopped())
                .unwrap_or(false),
        }
    }
}

impl fmt::Debug for Dependent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependent")
            .field("kind", &self.kind())
            .field("live", &self.is_live())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct MockDerived {
        id: NodeId,
        dirty: Cell<bool>,
    }

    impl DerivedNode for MockDerived {
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
            None
        }
    }

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
        assert!(id1 < id2);
    }

    #[test]
    fn kinds_display_their_public_names() {
        assert_eq!(NodeKind::Source.to_string(), "source");
        assert_eq!(NodeKind::Derived.to_string(), "computed");
        assert_eq!(NodeKind::Effect.to_string(), "effect");
    }

    #[test]
    fn dependent_stops_resolving_after_drop() {
        let node: Rc<dyn DerivedNode> = Rc::new(MockDerived {
            id: NodeId::new(),
            dirty: Cell::new(false),
        });
        let dependent = Dependent::Derived(Rc::downgrade(&node));

        assert_eq!(dependent.kind(), NodeKind::Derived);
        assert!(dependent.is_live());
        match dependent.upgrade() {
            Some(LiveDependent::Derived(live)) => {
                live.mark_dirty();
                assert!(live.is_dirty());
            }
            _ => panic!("expected a live derived node"),
        }

        drop(node);
        assert!(!dependent.is_live());
        assert!(dependent.upgrade().is_none());
    }
}
