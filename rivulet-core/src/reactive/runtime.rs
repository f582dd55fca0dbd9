//! Reactive Runtime
//!
//! The runtime is the per-thread coordinator behind signals, computeds and
//! effects. It owns the dynamically scoped state the engine consults while
//! propagating changes:
//!
//! - the **flush set**: effects scheduled by the propagation wave currently
//!   open on this thread, in the order they were reached;
//! - the **current effect**: the effect whose body is executing, which owns
//!   any effect created inside it;
//! - the **batch queue**: effect runs deferred until the outermost
//!   [`batch`](super::batch()) returns.
//!
//! The tracking set lives next door in [`context`](super::context).
//!
//! # Scopes
//!
//! Each piece of state is entered through a guard that restores the previous
//! value when dropped. Because restoration happens in `Drop`, a panic thrown
//! by user code unwinds through the guards and leaves the runtime exactly as
//! it was before the failed call.
//!
//! # Threads
//!
//! The graph is built from `Rc` and `Cell`, so it never leaves the thread
//! that created it. Every thread gets its own runtime.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, trace};

use super::effect::EffectNode;

#[derive(Default)]
struct Runtime {
    flush: RefCell<Option<VecDeque<Rc<EffectNode>>>>,
    current: RefCell<Option<Rc<EffectNode>>>,
    batch: RefCell<Option<VecDeque<Rc<EffectNode>>>>,
}

thread_local! {
    static RUNTIME: Runtime = Runtime::default();
}

// ----------------------------------------------------------------------------
// Propagation waves
// ----------------------------------------------------------------------------

/// Guard for one propagation wave.
///
/// Only the outermost wave owns the flush set; waves opened while it is being
/// marked or flushed add to the same set.
pub(crate) struct WaveScope {
    outermost: bool,
}

impl WaveScope {
    pub(crate) fn open() -> Self {
        let outermost = RUNTIME.with(|rt| {
            let mut flush = rt.flush.borrow_mut();
            if flush.is_some() {
                false
            } else {
                *flush = Some(VecDeque::new());
                true
            }
        });
        if outermost {
            trace!("wave opened");
        }
        Self { outermost }
    }

    pub(crate) fn is_outermost(&self) -> bool {
        self.outermost
    }
}

impl Drop for WaveScope {
    fn drop(&mut self) {
        if !self.outermost {
            return;
        }
        let leftover = RUNTIME.with(|rt| rt.flush.borrow_mut().take());
        // Only non-empty when a flushed effect panicked. Release the rest so
        // the next wave can schedule them again.
        if let Some(leftover) = leftover {
            for effect in leftover {
                effect.set_pending(false);
            }
        }
    }
}

/// Add an effect to the open wave's flush set.
///
/// The caller marks the effect pending first, and the walk never schedules a
/// pending effect, so each effect appears in the set at most once.
pub(crate) fn schedule(effect: Rc<EffectNode>) {
    RUNTIME.with(|rt| {
        if let Some(flush) = rt.flush.borrow_mut().as_mut() {
            flush.push_back(effect);
        }
    });
}

/// Take the next effect to run from the flush set, in scheduling order.
pub(crate) fn next_scheduled() -> Option<Rc<EffectNode>> {
    RUNTIME.with(|rt| rt.flush.borrow_mut().as_mut().and_then(VecDeque::pop_front))
}

// ----------------------------------------------------------------------------
// Current effect
// ----------------------------------------------------------------------------

/// Guard marking an effect as the one currently running its body.
pub(crate) struct EffectScope {
    prev: Option<Rc<EffectNode>>,
}

impl EffectScope {
    pub(crate) fn enter(effect: Rc<EffectNode>) -> Self {
        let prev = RUNTIME.with(|rt| rt.current.replace(Some(effect)));
        Self { prev }
    }
}

impl Drop for EffectScope {
    fn drop(&mut self) {
        let prev = self.prev.take();
        RUNTIME.with(|rt| {
            rt.current.replace(prev);
        });
    }
}

/// The effect whose body is executing, if any.
pub(crate) fn current_effect() -> Option<Rc<EffectNode>> {
    RUNTIME.with(|rt| rt.current.borrow().clone())
}

// ----------------------------------------------------------------------------
// Batches
// ----------------------------------------------------------------------------

/// Guard for a batch. Only the outermost one owns the queue.
pub(crate) struct BatchScope {
    outermost: bool,
}

impl BatchScope {
    pub(crate) fn open() -> Self {
        let outermost = RUNTIME.with(|rt| {
            let mut batch = rt.batch.borrow_mut();
            if batch.is_some() {
                false
            } else {
                *batch = Some(VecDeque::new());
                true
            }
        });
        Self { outermost }
    }

    pub(crate) fn is_outermost(&self) -> bool {
        self.outermost
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        if !self.outermost {
            return;
        }
        let leftover = RUNTIME.with(|rt| rt.batch.borrow_mut().take());
        if let Some(leftover) = leftover {
            if !leftover.is_empty() {
                debug!(dropped = leftover.len(), "batch closed with queued effects");
            }
            for effect in leftover {
                effect.set_pending(false);
            }
        }
    }
}

pub(crate) fn batch_is_open() -> bool {
    RUNTIME.with(|rt| rt.batch.borrow().is_some())
}

/// Queue an effect run until the outermost batch drains.
pub(crate) fn defer_to_batch(effect: Rc<EffectNode>) {
    RUNTIME.with(|rt| {
        if let Some(queue) = rt.batch.borrow_mut().as_mut() {
            queue.push_back(effect);
        }
    });
}

/// Take the next queued effect run, in the order they were queued.
pub(crate) fn next_batched() -> Option<Rc<EffectNode>> {
    RUNTIME.with(|rt| rt.batch.borrow_mut().as_mut().and_then(VecDeque::pop_front))
}
