//! Batching.
//!
//! Inside [`batch`], effects scheduled by propagation waves are queued
//! instead of run. The queue drains once, in the order effects were queued,
//! when the outermost `batch` call returns. Nested calls just run their body
//! and share the outer queue.
//!
//! An effect waiting in the queue stays pending, so further waves in the same
//! batch do not queue it again: three writes that each dirty one effect
//! produce one run.

use tracing::debug;

use super::runtime::{self, BatchScope};

/// Run `f`, deferring effect execution until the outermost batch completes.
///
/// Returns whatever `f` returns. If `f` panics, the queued runs are
/// discarded and the batch is closed before the panic continues.
///
/// ```rust
/// use rivulet_core::{batch, effect, signal};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let s = signal(1);
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let _dispose = effect({
///     let (s, log) = (s.clone(), log.clone());
///     move || log.borrow_mut().push(s.get() * 2)
/// });
///
/// let total = batch(|| {
///     s.set(2);
///     s.set(3);
///     s.peek()
/// });
///
/// assert_eq!(total, 3);
/// assert_eq!(*log.borrow(), vec![2, 6]);
/// ```
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let scope = BatchScope::open();
    let result = f();

    if scope.is_outermost() {
        let mut drained = 0usize;
        while let Some(effect) = runtime::next_batched() {
            effect.trigger();
            drained += 1;
        }
        if drained > 0 {
            debug!(effects = drained, "batch drained");
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{effect, signal};
    use std::cell::{Cell, RefCell};
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::rc::Rc;

    #[test]
    fn three_sources_one_run() {
        let (a, b, c) = (signal(0), signal(0), signal(0));
        let runs = Rc::new(Cell::new(0));
        let _dispose = effect({
            let (a, b, c, runs) = (a.clone(), b.clone(), c.clone(), runs.clone());
            move || {
                let _ = a.get() + b.get() + c.get();
                runs.set(runs.get() + 1);
            }
        });

        batch(|| {
            a.set(1);
            b.set(1);
            c.set(1);
            assert_eq!(runs.get(), 1);
        });
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn nested_batches_drain_at_the_outermost() {
        let source = signal(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _dispose = effect({
            let (source, seen) = (source.clone(), seen.clone());
            move || seen.borrow_mut().push(source.get())
        });

        batch(|| {
            batch(|| source.set(1));
            assert_eq!(*seen.borrow(), vec![0]);
            source.set(2);
        });
        assert_eq!(*seen.borrow(), vec![0, 2]);
    }

    #[test]
    fn drain_follows_queue_order() {
        let (a, b) = (signal(0), signal(0));
        let order = Rc::new(RefCell::new(Vec::new()));
        let _first = effect({
            let (a, order) = (a.clone(), order.clone());
            move || order.borrow_mut().push(("a", a.get()))
        });
        let _second = effect({
            let (b, order) = (b.clone(), order.clone());
            move || order.borrow_mut().push(("b", b.get()))
        });
        order.borrow_mut().clear();

        batch(|| {
            b.set(1);
            a.set(1);
        });
        assert_eq!(*order.borrow(), vec![("b", 1), ("a", 1)]);
    }

    #[test]
    fn panicking_body_closes_the_batch() {
        let source = signal(0);
        let seen = Rc::new(Cell::new(0));
        let _dispose = effect({
            let (source, seen) = (source.clone(), seen.clone());
            move || seen.set(source.get())
        });

        let result = catch_unwind(AssertUnwindSafe(|| {
            batch(|| {
                source.set(1);
                panic!("body failed");
            })
        }));
        assert!(result.is_err());
        assert!(!runtime::batch_is_open());
        assert_eq!(seen.get(), 0);

        // The discarded run is picked up again by the next change.
        source.set(2);
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn returns_the_body_result() {
        assert_eq!(batch(|| 40 + 2), 42);
    }
}
