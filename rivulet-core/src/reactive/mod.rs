//! Reactive Primitives
//!
//! This module implements the user-facing half of the runtime: sources,
//! computeds and effects, plus batching and the microtask queue that
//! deferred effects run from.
//!
//! # Concepts
//!
//! ## Sources
//!
//! A [`Reactive`] is a container for mutable state. When its value is read
//! while a computed or effect is evaluating, that computed or effect becomes
//! a dependent. When the value changes, dependents are notified.
//!
//! ## Computeds
//!
//! A [`Computed`] is a derived value that caches its result. It evaluates on
//! first read and afterwards only when it is read after a dependency changed.
//! Its result lives in an inner source, so a recomputation that lands on the
//! same value does not disturb anything downstream.
//!
//! ## Effects
//!
//! An effect is a computation run for its side effects whenever its
//! dependencies change. Effects are the only nodes that execute on their own;
//! everything else is pulled.
//!
//! # Implementation Notes
//!
//! Dependencies are found automatically. Each evaluation pushes a frame on a
//! thread-local tracking stack, and every source read while the frame is on
//! top records itself there. When the evaluation finishes the frame is popped
//! and the evaluating node is subscribed to everything it recorded.
//!
//! All state is per thread. Handles are `!Send` and the graph never crosses a
//! thread boundary.

mod batch;
mod computed;
mod context;
mod effect;
mod equality;
mod microtask;
pub(crate) mod runtime;
mod signal;
mod source;

pub use batch::batch;
pub use computed::{computed, Computed};
pub use context::{is_tracking, untrack};
pub use effect::{effect, effect_with, Disposer, EffectMode};
pub use equality::SameValue;
pub use microtask::{pending_microtasks, queue_microtask, run_microtasks};
pub use signal::Signal;
pub use source::{signal, Reactive};

pub(crate) use effect::EffectNode;
