//! Microtask queue.
//!
//! Deferred effects need a point "after the current code has finished but
//! before anything else happens". On this runtime that point is explicit:
//! tasks are appended to a per-thread FIFO queue and run when the host calls
//! [`run_microtasks`], typically once per turn of its own event loop.

use std::cell::RefCell;
use std::collections::VecDeque;

use tracing::trace;

type Task = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<VecDeque<Task>> = const { RefCell::new(VecDeque::new()) };
}

/// Append a task to this thread's microtask queue.
pub fn queue_microtask<F>(task: F)
where
    F: FnOnce() + 'static,
{
    QUEUE.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
}

/// Run queued microtasks until the queue is empty, including any queued by
/// the tasks themselves. Returns how many ran.
///
/// A panicking task propagates out of this call; the tasks behind it stay
/// queued for the next drain.
pub fn run_microtasks() -> usize {
    let mut ran = 0;
    while let Some(task) = QUEUE.with(|queue| queue.borrow_mut().pop_front()) {
        task();
        ran += 1;
    }
    if ran > 0 {
        trace!(ran, "microtasks drained");
    }
    ran
}

/// Number of tasks waiting in this thread's queue.
pub fn pending_microtasks() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}
