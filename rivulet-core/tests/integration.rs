//! Integration Tests for Reactive System
//!
//! These tests verify that sources, computeds, and effects work together
//! correctly through the public API only.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rivulet_core::{
    batch, computed, effect, effect_with, is_tracking, run_microtasks, signal, untrack,
    EffectMode, NodeKind, Signal, SignalError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn counter() -> Rc<Cell<i32>> {
    Rc::new(Cell::new(0))
}

/// Test that a computed is not evaluated until read, and only once per change.
#[test]
fn computed_is_lazily_memoized() {
    init_tracing();
    let calls = counter();
    let source = signal(10);

    let calls_clone = calls.clone();
    let source_clone = source.clone();
    let doubled = computed(move || {
        calls_clone.set(calls_clone.get() + 1);
        source_clone.get() * 2
    });

    // Nothing runs at construction
    assert_eq!(calls.get(), 0);

    // First access computes
    assert_eq!(doubled.get(), 20);
    assert_eq!(calls.get(), 1);

    // Subsequent accesses use the cache
    assert_eq!(doubled.get(), 20);
    assert_eq!(doubled.get(), 20);
    assert_eq!(calls.get(), 1);

    // A write only dirties; the next read recomputes
    source.set(5);
    assert_eq!(calls.get(), 1);
    assert_eq!(doubled.get(), 10);
    assert_eq!(calls.get(), 2);
}

/// Test that a diamond dependency runs the effect once per source write.
#[test]
fn diamond_runs_effect_once() {
    init_tracing();
    let runs = counter();
    let source = signal(1);

    let left = computed({
        let source = source.clone();
        move || source.get() + 1
    });
    let right = computed({
        let source = source.clone();
        move || source.get() * 10
    });

    let seen = Rc::new(RefCell::new(Vec::new()));
    let _dispose = effect({
        let (left, right, seen, runs) = (left.clone(), right.clone(), seen.clone(), runs.clone());
        move || {
            runs.set(runs.get() + 1);
            seen.borrow_mut().push(left.get() + right.get());
        }
    });
    assert_eq!(runs.get(), 1);

    source.set(2);
    assert_eq!(runs.get(), 2);
    assert_eq!(*seen.borrow(), vec![12, 23]);
}

/// Test that identical writes are dropped, with NaN equal to itself and the
/// two zeros distinct.
#[test]
fn same_value_writes_short_circuit() {
    init_tracing();
    let runs = counter();
    let source = signal(f64::NAN);

    let _dispose = effect({
        let (source, runs) = (source.clone(), runs.clone());
        move || {
            source.get();
            runs.set(runs.get() + 1);
        }
    });

    source.set(f64::NAN);
    assert_eq!(runs.get(), 1);

    source.set(0.0);
    assert_eq!(runs.get(), 2);

    // +0 and -0 are different values
    source.set(-0.0);
    assert_eq!(runs.get(), 3);

    source.set(-0.0);
    assert_eq!(runs.get(), 3);
}

/// Test that dropped computeds and effects are never invoked again and are
/// pruned from the source.
#[test]
fn dropped_nodes_are_cleaned_up() {
    init_tracing();
    let calls = counter();
    let source = signal(0);

    let derived = computed({
        let (source, calls) = (source.clone(), calls.clone());
        move || {
            calls.set(calls.get() + 1);
            source.get() + 1
        }
    });
    let dispose = effect({
        let (source, calls) = (source.clone(), calls.clone());
        move || {
            calls.set(calls.get() + 1);
            source.get();
        }
    });
    assert_eq!(derived.get(), 1);
    assert_eq!(source.subscriber_count(), 2);
    assert_eq!(calls.get(), 2);

    drop(derived);
    drop(dispose);

    // The write walks past two dead entries without touching them
    source.set(1);
    assert_eq!(calls.get(), 2);
    assert_eq!(source.subscriber_count(), 0);
}

/// Test that writes to three sources inside a batch run the effect once,
/// after the body returns.
#[test]
fn batch_coalesces_effect_runs() {
    init_tracing();
    let runs = counter();
    let (a, b, c) = (signal(0), signal(0), signal(0));

    let _dispose = effect({
        let (a, b, c, runs) = (a.clone(), b.clone(), c.clone(), runs.clone());
        move || {
            let _ = a.get() + b.get() + c.get();
            runs.set(runs.get() + 1);
        }
    });

    batch(|| {
        a.set(1);
        b.set(2);
        c.set(3);
        // Still only the initial run
        assert_eq!(runs.get(), 1);
    });
    assert_eq!(runs.get(), 2);
}

/// Test that disposing twice is harmless and that nested effects stop with
/// their parent.
#[test]
fn disposal_stops_parent_and_children() {
    init_tracing();
    let parent_runs = counter();
    let child_runs = counter();
    let source = signal(0);

    let dispose = effect({
        let (source, parent_runs, child_runs) =
            (source.clone(), parent_runs.clone(), child_runs.clone());
        move || {
            parent_runs.set(parent_runs.get() + 1);
            let _child = effect({
                let (source, child_runs) = (source.clone(), child_runs.clone());
                move || {
                    source.get();
                    child_runs.set(child_runs.get() + 1);
                }
            });
            source.get();
        }
    });
    assert_eq!(parent_runs.get(), 1);
    assert_eq!(child_runs.get(), 1);

    dispose.dispose();
    dispose.dispose();
    assert!(dispose.is_stopped());

    source.set(1);
    assert_eq!(parent_runs.get(), 1);
    assert_eq!(child_runs.get(), 1);
}

/// Test the complete chain: source -> computed -> effect, with a no-op write
/// and a real one.
#[test]
fn end_to_end_source_computed_effect() {
    init_tracing();
    let s = signal(1);
    let c = computed({
        let s = s.clone();
        move || s.get() * 2
    });

    let log = Rc::new(RefCell::new(Vec::new()));
    let _dispose = effect({
        let (c, log) = (c.clone(), log.clone());
        move || log.borrow_mut().push(c.get())
    });
    assert_eq!(*log.borrow(), vec![2]);

    // Same value: nothing happens
    s.set(1);
    assert_eq!(*log.borrow(), vec![2]);

    s.set(5);
    assert_eq!(*log.borrow(), vec![2, 10]);
}

/// Test that two writes in one batch log only the final value.
#[test]
fn end_to_end_batch_logs_final_value() {
    init_tracing();
    let s = signal(1);
    let c = computed({
        let s = s.clone();
        move || s.get() * 2
    });

    let log = Rc::new(RefCell::new(Vec::new()));
    let _dispose = effect({
        let (c, log) = (c.clone(), log.clone());
        move || log.borrow_mut().push(c.get())
    });

    batch(|| {
        s.set(2);
        s.set(3);
    });
    assert_eq!(*log.borrow(), vec![2, 6]);
}

/// Test that deferred effects wait for the microtask queue.
#[test]
fn deferred_effects_run_from_microtasks() {
    init_tracing();
    let source = signal("a".to_string());
    let log = Rc::new(RefCell::new(Vec::new()));

    let _dispose = effect_with(
        {
            let (source, log) = (source.clone(), log.clone());
            move || log.borrow_mut().push(source.get())
        },
        EffectMode::Deferred,
    );
    assert!(log.borrow().is_empty());

    run_microtasks();
    assert_eq!(*log.borrow(), vec!["a"]);

    source.set("b".to_string());
    source.set("c".to_string());
    run_microtasks();
    assert_eq!(*log.borrow(), vec!["a", "c"]);
}

/// Test that computeds refuse writes through the shared trait.
#[test]
fn computed_rejects_writes() {
    let source = signal(1);
    let derived = computed({
        let source = source.clone();
        move || source.get() + 1
    });

    let handles: Vec<Box<dyn Signal<i32>>> = vec![Box::new(source.clone()), Box::new(derived)];
    assert!(handles[0].try_set(5).is_ok());

    let err = handles[1].try_set(5).unwrap_err();
    assert!(err.is_invalid_mutation());
    assert!(matches!(
        err,
        SignalError::InvalidMutation {
            kind: NodeKind::Derived
        }
    ));
    assert_eq!(
        err.to_string(),
        "invalid mutation: cannot assign to a computed node"
    );

    // The trait's conversions read the current value
    assert_eq!(handles[1].get(), 6);
    assert_eq!(handles[1].to_number(), Some(6.0));
}

/// Test that untracked reads inside an effect do not subscribe it.
#[test]
fn untrack_hides_reads_from_the_effect() {
    let tracked = signal(0);
    let hidden = signal(0);
    let runs = counter();

    let _dispose = effect({
        let (tracked, hidden, runs) = (tracked.clone(), hidden.clone(), runs.clone());
        move || {
            assert!(is_tracking());
            tracked.get();
            untrack(|| {
                assert!(!is_tracking());
                hidden.get()
            });
            runs.set(runs.get() + 1);
        }
    });

    hidden.set(1);
    assert_eq!(runs.get(), 1);
    tracked.set(1);
    assert_eq!(runs.get(), 2);
    assert_eq!(hidden.subscriber_count(), 0);
}
