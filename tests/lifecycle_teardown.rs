// ============================================================================
// Teardown and ownership lifecycle tests
// ============================================================================

use pulse_reactive::{
    record, run_deferred, Scope, Value, WatchSource, Watcher, WatcherOptions,
};
use std::cell::Cell;
use std::rc::Rc;

fn read(scope: &Scope, key: &str) -> Value {
    scope.data().as_record().unwrap().get(key)
}

fn write(scope: &Scope, key: &str, value: Value) {
    scope.data().as_record().unwrap().set(key, value);
}

#[test]
fn teardown_removes_every_subscription() {
    let scope = Scope::new(record! { a: 1, b: 2 });

    let watcher = Watcher::new(
        &scope,
        WatchSource::func(|s| {
            let a = read(s, "a").as_num().unwrap_or(0.0);
            let b = read(s, "b").as_num().unwrap_or(0.0);
            Value::from(a + b)
        }),
        |_, _, _| {},
        WatcherOptions::default(),
        false,
    );

    let data = scope.data();
    let record = data.as_record().unwrap();
    let dep_a = record.slot_dep("a").unwrap();
    let dep_b = record.slot_dep("b").unwrap();
    assert!(dep_a.has_sub(watcher.id()));
    assert!(dep_b.has_sub(watcher.id()));

    watcher.teardown();

    assert!(!dep_a.has_sub(watcher.id()));
    assert!(!dep_b.has_sub(watcher.id()));
    assert!(!watcher.is_active());
    assert_eq!(scope.watcher_count(), 0);
}

#[test]
fn torn_down_watcher_in_the_queue_is_skipped() {
    let scope = Scope::new(record! { a: 1 });
    let runs = Rc::new(Cell::new(0));

    let count = runs.clone();
    let watcher = Watcher::new(
        &scope,
        WatchSource::func(|s| read(s, "a")),
        move |_, _, _| count.set(count.get() + 1),
        WatcherOptions::default(),
        false,
    );

    // dirty the watcher, then cancel it before the flush drains
    write(&scope, "a", Value::from(2));
    watcher.teardown();
    run_deferred();

    assert_eq!(runs.get(), 0);
}

#[test]
fn teardown_is_idempotent() {
    let scope = Scope::new(record! { a: 1 });
    let watcher = Watcher::new(
        &scope,
        WatchSource::func(|s| read(s, "a")),
        |_, _, _| {},
        WatcherOptions::default(),
        false,
    );

    watcher.teardown();
    watcher.teardown();
    assert!(!watcher.is_active());
}

#[test]
fn destroying_a_scope_cancels_all_its_watchers() {
    let scope = Scope::new(record! { a: 1, b: 2 });
    let runs = Rc::new(Cell::new(0));

    let count = runs.clone();
    let _first = Watcher::new(
        &scope,
        WatchSource::func(|s| read(s, "a")),
        move |_, _, _| count.set(count.get() + 1),
        WatcherOptions::default(),
        false,
    );
    let count = runs.clone();
    let _second = Watcher::new(
        &scope,
        WatchSource::func(|s| read(s, "b")),
        move |_, _, _| count.set(count.get() + 1),
        WatcherOptions::default(),
        false,
    );
    assert_eq!(scope.watcher_count(), 2);

    scope.destroy();
    assert!(scope.is_destroyed());
    assert_eq!(scope.watcher_count(), 0);

    write(&scope, "a", Value::from(10));
    write(&scope, "b", Value::from(20));
    run_deferred();
    assert_eq!(runs.get(), 0);
}

#[test]
fn watcher_torn_down_mid_flush_short_circuits_its_queued_entry() {
    // the killer has the lower id, so it runs first in the flush and cancels
    // the victim while the victim's entry is still queued
    let scope = Scope::new(record! { x: 0, y: 0 });
    let victim_runs = Rc::new(Cell::new(0));

    let victim_slot: Rc<std::cell::RefCell<Option<Rc<Watcher>>>> =
        Rc::new(std::cell::RefCell::new(None));

    let slot = victim_slot.clone();
    let _killer = Watcher::new(
        &scope,
        WatchSource::func(|s| read(s, "x")),
        move |_, _, _| {
            if let Some(victim) = slot.borrow().as_ref() {
                victim.teardown();
            }
        },
        WatcherOptions::default(),
        false,
    );

    let count = victim_runs.clone();
    let victim = Watcher::new(
        &scope,
        WatchSource::func(|s| read(s, "y")),
        move |_, _, _| count.set(count.get() + 1),
        WatcherOptions::default(),
        false,
    );
    *victim_slot.borrow_mut() = Some(victim);

    write(&scope, "x", Value::from(1));
    write(&scope, "y", Value::from(1));
    run_deferred();

    // the victim was queued but cancelled before its turn came up
    assert_eq!(victim_runs.get(), 0);

    write(&scope, "y", Value::from(2));
    run_deferred();
    assert_eq!(victim_runs.get(), 0);
}

#[test]
fn render_watcher_updated_hook_stops_after_destroy() {
    use pulse_reactive::{clear_lifecycle_hook, set_lifecycle_hook, LifecycleEvent};
    use std::cell::RefCell;

    let scope = Scope::new(record! { a: 1 });
    scope.set_mounted(true);

    let events: Rc<RefCell<Vec<LifecycleEvent>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    set_lifecycle_hook(move |event, _| sink.borrow_mut().push(event));

    let _render = Watcher::new(
        &scope,
        WatchSource::func(|s| read(s, "a")),
        |_, _, _| {},
        WatcherOptions::default(),
        true,
    );

    write(&scope, "a", Value::from(2));
    run_deferred();
    assert_eq!(*events.borrow(), vec![LifecycleEvent::Updated]);

    scope.destroy();
    write(&scope, "a", Value::from(3));
    run_deferred();
    assert_eq!(*events.borrow(), vec![LifecycleEvent::Updated]);

    clear_lifecycle_hook();
}
