//! Dependency Graph
//!
//! Node identity and the change-propagation engine.
//!
//! # Overview
//!
//! The graph is never stored in one place. Each source owns a
//! [`SubscriberSet`](subscribers::SubscriberSet) of weak references to the
//! nodes that read it, and each derived node owns the memoized source its
//! own readers subscribe to. Edges therefore live next to the node they
//! point out of, and dropping a dependent needs no bookkeeping on the
//! source side: the dead entry is pruned when a walk next reaches it.
//!
//! # Design Decisions
//!
//! 1. Dependents are a closed enum (derived or effect) rather than a trait
//!    object with a "what are you" query, so the walk is an exhaustive match.
//!
//! 2. Node ids come from a global counter and are never reused, which makes
//!    them safe keys for weak entries that may outlive their node.
//!
//! 3. Derived nodes are only dirtied by the walk; running them is left to
//!    whoever reads them next. Only effects are scheduled.

mod node;
mod scheduler;
mod subscribers;

pub use node::{NodeId, NodeKind};

pub(crate) use node::{Dependent, DerivedNode};
pub(crate) use scheduler::propagate;
pub(crate) use subscribers::SubscriberSet;
