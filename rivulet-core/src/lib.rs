//! Rivulet Core
//!
//! A fine-grained reactive runtime: writable sources, lazily memoized
//! computeds and effects, connected by a dependency graph that is discovered
//! while code runs rather than declared up front.
//!
//! It implements:
//!
//! - Reactive primitives (sources, computeds, effects)
//! - Push-pull propagation: writes push dirty flags, reads pull values
//! - Batching and deferred (microtask) effect scheduling
//! - Weak subscriptions, so dropped nodes clean up after themselves
//!
//! # Architecture
//!
//! The crate is organized into a few modules:
//!
//! - `reactive`: the primitives, dependency tracking and scheduling state
//! - `graph`: node identity, subscriber sets and the propagation walk
//! - `error`: the crate's error type
//!
//! # Example
//!
//! ```rust
//! use rivulet_core::{computed, effect, signal};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! // Create a source
//! let count = signal(1);
//!
//! // Create a derived value
//! let doubled = computed({
//!     let count = count.clone();
//!     move || count.get() * 2
//! });
//!
//! // Create an effect
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let _dispose = effect({
//!     let (doubled, log) = (doubled.clone(), log.clone());
//!     move || log.borrow_mut().push(doubled.get())
//! });
//!
//! // Update the source; the effect runs before `set` returns
//! count.set(5);
//! assert_eq!(*log.borrow(), vec![2, 10]);
//! ```

pub mod error;
pub mod graph;
pub mod reactive;

pub use error::{Result, SignalError};
pub use graph::{NodeId, NodeKind};
pub use reactive::{
    batch, computed, effect, effect_with, is_tracking, pending_microtasks, queue_microtask,
    run_microtasks, signal, untrack, Computed, Disposer, EffectMode, Reactive, SameValue, Signal,
};
