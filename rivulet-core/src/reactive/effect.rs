//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. [`effect`] creates the node and runs it straight away to establish
//!    its dependencies, exactly as the first read of a computed would.
//!
//! 2. When a dependency changes, the propagation wave marks the effect
//!    dirty and schedules it. Once the wave has finished marking, the
//!    effect runs (or is queued, if a [`batch`](super::batch()) is open).
//!
//! 3. A run evaluates the body only when the effect is dirty, so scheduling
//!    the same effect twice is harmless.
//!
//! # Scheduling Modes
//!
//! - [`EffectMode::Sync`] runs the body inside the call that triggered it.
//! - [`EffectMode::Deferred`] queues a microtask instead. Any further
//!   triggers before that microtask runs collapse into it.
//!
//! # Nested Effects
//!
//! Calling [`effect`] while another effect's body is running does not make a
//! fresh node on every run. The running effect keeps an ordered list of the
//! children it created, and the n-th call during a run reuses the n-th
//! child, keeping its dirty flag and subscriptions. Children must be created
//! in the same order on every run; debug builds check this.
//!
//! # Cleanup
//!
//! [`Disposer::dispose`] stops an effect and every child it owns. Dropping
//! every [`Disposer`] of a top-level effect drops the effect itself, because
//! the sources it reads only hold it weakly.

use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::context::{self, TrackingScope};
use super::microtask;
use super::runtime::{self, EffectScope};
use crate::graph::{Dependent, NodeId};

/// How an effect is run once it has been triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectMode {
    /// Run synchronously, before the triggering write returns.
    #[default]
    Sync,

    /// Run from a microtask, after the triggering code has finished.
    Deferred,
}

/// An active subscriber in the graph.
pub(crate) struct EffectNode {
    id: NodeId,
    mode: EffectMode,
    /// Type of the closure the node was created from.
    origin: TypeId,
    body: RefCell<Option<Rc<dyn Fn()>>>,
    established: Cell<bool>,
    dirty: Cell<bool>,
    /// A run has been scheduled or is in progress.
    pending: Cell<bool>,
    /// A microtask has been queued and has not fired yet.
    microtask: Cell<bool>,
    stopped: Cell<bool>,
    child_index: Cell<usize>,
    children: RefCell<Vec<Rc<EffectNode>>>,
}

impl EffectNode {
    pub(crate) fn new<F>(body: F, mode: EffectMode) -> Rc<Self>
    where
        F: Fn() + 'static,
    {
        Rc::new(Self {
            id: NodeId::new(),
            mode,
            origin: TypeId::of::<F>(),
            body: RefCell::new(Some(Rc::new(body))),
            established: Cell::new(false),
            dirty: Cell::new(false),
            pending: Cell::new(false),
            microtask: Cell::new(false),
            stopped: Cell::new(false),
            child_index: Cell::new(0),
            children: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.get()
    }

    pub(crate) fn set_pending(&self, pending: bool) {
        self.pending.set(pending);
    }

    pub(crate) fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    /// Dirty every child this effect has already created, transitively.
    pub(crate) fn cascade_dirty(&self) {
        for child in self.children.borrow().iter() {
            child.dirty.set(true);
            child.cascade_dirty();
        }
    }

    /// Run according to the scheduling mode.
    pub(crate) fn trigger(self: &Rc<Self>) {
        if self.stopped.get() {
            return;
        }
        match self.mode {
            EffectMode::Sync => self.run(),
            EffectMode::Deferred => self.defer(),
        }
    }

    fn defer(self: &Rc<Self>) {
        if self.microtask.replace(true) {
            return;
        }
        trace!(effect = %self.id, "effect deferred to microtask");
        let weak = Rc::downgrade(self);
        microtask::queue_microtask(move || {
            if let Some(effect) = weak.upgrade() {
                effect.microtask.set(false);
                effect.run();
            }
        });
    }

    /// Synchronous execution: establish on the first run, re-evaluate when
    /// dirty, otherwise do nothing.
    fn run(self: &Rc<Self>) {
        if self.stopped.get() {
            return;
        }

        let _pending = PendingGuard::hold(self);
        let _scope = EffectScope::enter(Rc::clone(self));
        self.child_index.set(0);

        if !self.established.get() {
            self.evaluate();
            self.established.set(true);
            self.dirty.set(false);
        } else if self.dirty.get() {
            self.evaluate();
            self.dirty.set(false);
        }
    }

    fn evaluate(self: &Rc<Self>) {
        // Clone the body out so it may stop this very effect while running.
        let Some(body) = self.body.borrow().clone() else {
            return;
        };

        let scope = TrackingScope::enter(self.id);
        body();
        let sources = scope.finish();

        if !self.stopped.get() {
            context::subscribe_all(sources, self.id, &Dependent::Effect(Rc::downgrade(self)));
        }
    }

    /// The child effect at the next position of the current run.
    fn adopt_child<F>(self: &Rc<Self>, body: F, mode: EffectMode) -> Rc<EffectNode>
    where
        F: Fn() + 'static,
    {
        let index = self.child_index.get();
        self.child_index.set(index + 1);

        if self.stopped.get() {
            // A stopped parent owns nothing; hand back an inert child.
            let child = EffectNode::new(body, mode);
            child.stop();
            return child;
        }

        let mut children = self.children.borrow_mut();
        if let Some(child) = children.get(index) {
            if child.origin != TypeId::of::<F>() || child.mode != mode {
                warn!(
                    parent = %self.id,
                    index,
                    "nested effect created out of order; reusing the slot anyway"
                );
                debug_assert!(
                    false,
                    "nested effect at position {index} of {} changed between runs",
                    self.id
                );
            }
            return Rc::clone(child);
        }

        let child = EffectNode::new(body, mode);
        trace!(parent = %self.id, child = %child.id, index, "nested effect created");
        children.push(Rc::clone(&child));
        child
    }

    /// Stop the effect and all of its children. Idempotent.
    pub(crate) fn stop(&self) {
        if self.stopped.replace(true) {
            return;
        }
        self.body.borrow_mut().take();
        let children = std::mem::take(&mut *self.children.borrow_mut());
        debug!(effect = %self.id, children = children.len(), "effect stopped");
        for child in children {
            child.stop();
        }
    }
}

impl fmt::Debug for EffectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectNode")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("dirty", &self.dirty.get())
            .field("pending", &self.pending.get())
            .field("stopped", &self.stopped.get())
            .field("children", &self.children.borrow().len())
            .finish()
    }
}

/// Holds an effect's pending flag for the duration of a run, so writes the
/// body makes to its own dependencies do not schedule it again.
struct PendingGuard<'a> {
    effect: &'a EffectNode,
}

impl<'a> PendingGuard<'a> {
    fn hold(effect: &'a EffectNode) -> Self {
        effect.pending.set(true);
        Self { effect }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.effect.pending.set(false);
    }
}

/// Handle returned by [`effect`]. Stops the effect when disposed.
///
/// For a top-level effect this handle is also what keeps the effect alive:
/// once every disposer is dropped, the effect is dropped with it.
#[must_use = "dropping the disposer of a top-level effect drops the effect"]
#[derive(Clone)]
pub struct Disposer {
    node: Rc<EffectNode>,
}

impl Disposer {
    /// Stop the effect and every nested effect it owns.
    ///
    /// Calling this more than once is a no-op.
    pub fn dispose(&self) {
        self.node.stop();
    }

    /// Whether the effect has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.node.is_stopped()
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> NodeId {
        self.node.id
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Disposer").field(&self.node).finish()
    }
}

/// Run `f` now and again whenever something it reads changes.
///
/// ```rust
/// use rivulet_core::{effect, signal};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let count = signal(1);
/// let log = Rc::new(RefCell::new(Vec::new()));
///
/// let dispose = effect({
///     let (count, log) = (count.clone(), log.clone());
///     move || log.borrow_mut().push(count.get())
/// });
///
/// count.set(2);
/// dispose.dispose();
/// count.set(3);
///
/// assert_eq!(*log.borrow(), vec![1, 2]);
/// ```
pub fn effect<F>(f: F) -> Disposer
where
    F: Fn() + 'static,
{
    effect_with(f, EffectMode::Sync)
}

/// Like [`effect`], with an explicit scheduling mode.
///
/// A deferred effect does not run until the microtask queue is drained with
/// [`run_microtasks`](super::run_microtasks).
pub fn effect_with<F>(f: F, mode: EffectMode) -> Disposer
where
    F: Fn() + 'static,
{
    let node = match runtime::current_effect() {
        Some(parent) => parent.adopt_child(f, mode),
        None => EffectNode::new(f, mode),
    };
    node.trigger();
    Disposer { node }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
