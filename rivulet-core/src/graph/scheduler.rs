//! Propagation Walk
//!
//! A write that changes a source hands the source's subscriber set to
//! [`propagate`]. The walk:
//!
//! 1. Resolves each weak entry, pruning the ones whose node is gone.
//! 2. Marks derived nodes dirty and continues through their own subscribers.
//!    Derived nodes are never run here; they recompute when next read.
//! 3. Marks effects dirty, adds them to the wave's flush set, and dirties the
//!    child effects they already own.
//! 4. At the outermost wave only, runs every scheduled effect once, or hands
//!    it to the open batch.
//!
//! A node that is already dirty (or an effect whose run is still pending) is
//! skipped, which is what makes diamond-shaped graphs run their effects once.

use tracing::trace;

use super::node::LiveDependent;
use super::subscribers::SubscriberSet;
use crate::reactive::runtime::{self, WaveScope};

/// Propagate a change through `subscribers`.
pub(crate) fn propagate(subscribers: &SubscriberSet) {
    if subscribers.is_empty() {
        return;
    }

    let wave = WaveScope::open();
    mark(subscribers);

    if wave.is_outermost() {
        flush();
    }
}

/// The dirty-marking step, recursive over derived nodes.
fn mark(subscribers: &SubscriberSet) {
    let mut found_dead = false;

    for (_, dependent) in subscribers.snapshot() {
        match dependent.upgrade() {
            None => found_dead = true,
            Some(LiveDependent::Derived(node)) => {
                if node.is_dirty() {
                    continue;
                }
                node.mark_dirty();
                trace!(source = %subscribers.source(), node = %node.id(), "computed dirtied");
                if let Some(downstream) = node.downstream() {
                    mark(&downstream);
                }
            }
            Some(LiveDependent::Effect(effect)) => {
                if effect.is_stopped() {
                    found_dead = true;
                    continue;
                }
                if effect.is_pending() {
                    continue;
                }
                effect.mark_dirty();
                effect.set_pending(true);
                effect.cascade_dirty();
                trace!(source = %subscribers.source(), effect = %effect.id(), "effect scheduled");
                runtime::schedule(effect);
            }
        }
    }

    if found_dead {
        subscribers.prune_dead();
    }
}

/// Run every effect in the current flush set, including effects scheduled
/// by the ones that run before them.
fn flush() {
    let mut ran = 0usize;
    while let Some(effect) = runtime::next_scheduled() {
        if runtime::batch_is_open() {
            runtime::defer_to_batch(effect);
        } else {
            effect.trigger();
        }
        ran += 1;
    }
    trace!(effects = ran, "wave flushed");
}
