// ============================================================================
// pulse-reactive - Watcher
// A reactive computation bound to a callback
// ============================================================================
//
// A watcher evaluates its getter with itself on the target stack, so every
// reactive read attributes itself here. Dependencies are re-collected on
// every evaluation into the `new_*` set and reconciled against the previous
// set afterwards; subscriptions that stopped being read are pruned.
//
// Modes:
// - eager (default): evaluated on construction, re-runs through the queue
// - lazy: a memoized thunk; `update` only marks dirty, `evaluate` recomputes
// - sync: the callback fires inside `Dep::notify`, no queue involved
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::core::context::{has_target, pop_target, push_target, with_context};
use crate::core::value::Value;
use crate::primitives::path::parse_path;
use crate::primitives::scope::{Scope, ScopeInner};
use crate::reactivity::dep::Dep;
use crate::reactivity::equality::same_value;
use crate::reactivity::scheduling::queue_watcher;
use crate::reactivity::traverse::traverse;
use crate::shared::host::{panic_reason, report_error, WatchError};

// =============================================================================
// WATCH SOURCE & OPTIONS
// =============================================================================

/// What a watcher evaluates: a getter closure, or a dotted path resolved
/// against the scope's root record.
pub enum WatchSource {
    Func(Rc<dyn Fn(&Scope) -> Value>),
    Path(String),
}

impl WatchSource {
    pub fn func(f: impl Fn(&Scope) -> Value + 'static) -> Self {
        WatchSource::Func(Rc::new(f))
    }

    pub fn path(path: impl Into<String>) -> Self {
        WatchSource::Path(path.into())
    }
}

impl From<&str> for WatchSource {
    fn from(path: &str) -> Self {
        WatchSource::Path(path.to_string())
    }
}

#[derive(Default)]
pub struct WatcherOptions {
    /// Traverse the result after every evaluation so nested deps subscribe.
    pub deep: bool,
    /// User-supplied closures: failures route to the error hook.
    pub user: bool,
    /// Do not evaluate on construction; recompute on demand via `evaluate`.
    pub lazy: bool,
    /// Run the callback inside `Dep::notify` instead of the queue.
    pub sync: bool,
    /// Invoked by the scheduler just before `run`.
    pub before: Option<Box<dyn Fn()>>,
}

// =============================================================================
// WATCHER
// =============================================================================

pub struct Watcher {
    id: u64,
    scope: Weak<ScopeInner>,
    getter: Rc<dyn Fn(&Scope) -> Value>,
    cb: Box<dyn Fn(&Scope, Value, Value)>,
    /// String form of the source, for diagnostics.
    expression: String,

    deep: bool,
    user: bool,
    lazy: bool,
    sync: bool,
    is_render: bool,
    before: Option<Box<dyn Fn()>>,

    active: Cell<bool>,
    dirty: Cell<bool>,
    value: RefCell<Value>,

    deps: RefCell<Vec<Rc<Dep>>>,
    dep_ids: RefCell<HashSet<u64>>,
    new_deps: RefCell<Vec<Rc<Dep>>>,
    new_dep_ids: RefCell<HashSet<u64>>,

    self_weak: RefCell<Weak<Watcher>>,
}

impl Watcher {
    pub fn new(
        scope: &Scope,
        source: WatchSource,
        cb: impl Fn(&Scope, Value, Value) + 'static,
        options: WatcherOptions,
        is_render: bool,
    ) -> Rc<Watcher> {
        let (getter, expression): (Rc<dyn Fn(&Scope) -> Value>, String) = match source {
            WatchSource::Func(f) => (f, "<closure>".to_string()),
            WatchSource::Path(path) => match parse_path(&path) {
                Some(getter) => (getter, path),
                None => {
                    warn!(
                        path = %path,
                        "watcher path contains non-identifier segments; getter is a no-op"
                    );
                    (Rc::new(|_: &Scope| Value::Null), path)
                }
            },
        };

        let watcher = Rc::new(Watcher {
            id: with_context(|ctx| ctx.next_watcher_id()),
            scope: scope.downgrade(),
            getter,
            cb: Box::new(cb),
            expression,
            deep: options.deep,
            user: options.user,
            lazy: options.lazy,
            sync: options.sync,
            is_render,
            before: options.before,
            active: Cell::new(true),
            dirty: Cell::new(options.lazy),
            value: RefCell::new(Value::Null),
            deps: RefCell::new(Vec::new()),
            dep_ids: RefCell::new(HashSet::new()),
            new_deps: RefCell::new(Vec::new()),
            new_dep_ids: RefCell::new(HashSet::new()),
            self_weak: RefCell::new(Weak::new()),
        });
        *watcher.self_weak.borrow_mut() = Rc::downgrade(&watcher);

        scope.register_watcher(&watcher, is_render);

        if !watcher.lazy {
            let value = watcher.get();
            *watcher.value.borrow_mut() = value;
        }
        watcher
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn is_render(&self) -> bool {
        self.is_render
    }

    /// The value cached by the last evaluation.
    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    pub fn dep_count(&self) -> usize {
        self.deps.borrow().len()
    }

    /// Ids of the deps collected by the last evaluation.
    pub fn dep_ids(&self) -> Vec<u64> {
        self.deps.borrow().iter().map(|d| d.id()).collect()
    }

    /// Size of the in-progress collection set; empty between evaluations.
    pub fn new_dep_count(&self) -> usize {
        self.new_deps.borrow().len()
    }

    pub(crate) fn scope(&self) -> Option<Scope> {
        self.scope.upgrade().map(Scope::from_inner)
    }

    pub(crate) fn call_before(&self) {
        if let Some(before) = &self.before {
            before();
        }
    }

    // =========================================================================
    // EVALUATION
    // =========================================================================

    /// Evaluate the getter with this watcher as the collection target.
    ///
    /// The target pop and the dependency reconciliation run in a drop guard,
    /// so an unwinding internal getter still leaves the stack and the
    /// subscription graph consistent.
    pub fn get(&self) -> Value {
        let self_rc = match self.self_weak.borrow().upgrade() {
            Some(rc) => rc,
            None => return Value::Null,
        };
        push_target(Some(self_rc));

        struct EvalGuard<'a> {
            watcher: &'a Watcher,
        }
        impl Drop for EvalGuard<'_> {
            fn drop(&mut self) {
                pop_target();
                self.watcher.cleanup_deps();
            }
        }
        let guard = EvalGuard { watcher: self };

        let value = match self.scope.upgrade() {
            None => Value::Null,
            Some(inner) => {
                let scope = Scope::from_inner(inner);
                if self.user {
                    match catch_unwind(AssertUnwindSafe(|| (self.getter)(&scope))) {
                        Ok(value) => value,
                        Err(payload) => {
                            report_error(
                                WatchError::Getter {
                                    expression: self.expression.clone(),
                                    reason: panic_reason(payload),
                                },
                                Some(&scope),
                            );
                            Value::Null
                        }
                    }
                } else {
                    (self.getter)(&scope)
                }
            }
        };

        if self.deep {
            traverse(&value);
        }
        drop(guard);
        value
    }

    /// Register a dep read during the current evaluation. Skips redundant
    /// `add_sub` calls for deps already subscribed in the previous round.
    pub fn add_dep(&self, dep: Rc<Dep>) {
        let id = dep.id();
        if !self.new_dep_ids.borrow().contains(&id) {
            self.new_dep_ids.borrow_mut().insert(id);
            let already_subscribed = self.dep_ids.borrow().contains(&id);
            self.new_deps.borrow_mut().push(dep.clone());
            if !already_subscribed {
                if let Some(self_rc) = self.self_weak.borrow().upgrade() {
                    dep.add_sub(&self_rc);
                }
            }
        }
    }

    /// Reconcile the dependency sets after an evaluation: unsubscribe from
    /// deps that were not read this round, then swap old and new.
    fn cleanup_deps(&self) {
        {
            let deps = self.deps.borrow();
            let new_ids = self.new_dep_ids.borrow();
            for dep in deps.iter() {
                if !new_ids.contains(&dep.id()) {
                    dep.remove_sub(self.id);
                }
            }
        }
        mem::swap(
            &mut *self.dep_ids.borrow_mut(),
            &mut *self.new_dep_ids.borrow_mut(),
        );
        self.new_dep_ids.borrow_mut().clear();
        mem::swap(&mut *self.deps.borrow_mut(), &mut *self.new_deps.borrow_mut());
        self.new_deps.borrow_mut().clear();
    }

    // =========================================================================
    // UPDATE / RUN
    // =========================================================================

    /// Dispatch a dependency notification according to mode.
    pub fn update(&self) {
        if self.lazy {
            self.dirty.set(true);
        } else if self.sync {
            self.run();
        } else if let Some(self_rc) = self.self_weak.borrow().upgrade() {
            queue_watcher(self_rc);
        }
    }

    /// Re-evaluate and deliver the callback. The callback fires when the
    /// value changed, when the value is a container (in-place mutation is
    /// invisible to equality), or when the watcher is deep.
    pub fn run(&self) {
        if !self.active.get() {
            return;
        }
        let value = self.get();
        let changed =
            !same_value(&value, &self.value.borrow()) || value.is_container() || self.deep;
        if !changed {
            return;
        }

        let old = self.value.replace(value.clone());
        let scope = match self.scope.upgrade() {
            Some(inner) => Scope::from_inner(inner),
            None => return,
        };

        if self.user {
            let result = catch_unwind(AssertUnwindSafe(|| {
                (self.cb)(&scope, value.clone(), old.clone())
            }));
            if let Err(payload) = result {
                report_error(
                    WatchError::Callback {
                        expression: self.expression.clone(),
                        reason: panic_reason(payload),
                    },
                    Some(&scope),
                );
            }
        } else {
            (self.cb)(&scope, value, old);
        }
    }

    // =========================================================================
    // LAZY PROTOCOL
    // =========================================================================

    /// Recompute the cached value and clear the dirty flag. Lazy-only entry
    /// point; accessors backed by a lazy watcher call this on demand.
    pub fn evaluate(&self) {
        let value = self.get();
        *self.value.borrow_mut() = value;
        self.dirty.set(false);
    }

    /// Re-register all of this watcher's deps with the current target, so a
    /// consumer of a lazy watcher transitively depends on everything it
    /// reads.
    pub fn depend(&self) {
        let deps: Vec<Rc<Dep>> = self.deps.borrow().clone();
        for dep in deps {
            dep.depend();
        }
    }

    /// The memoized-thunk read: evaluate if dirty, chain deps to the current
    /// target, return the cache.
    pub fn cached_value(&self) -> Value {
        if self.dirty.get() {
            self.evaluate();
        }
        if has_target() {
            self.depend();
        }
        self.value()
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Cancel this watcher: leave the owner's list (unless the owner is
    /// mid-destroy), unsubscribe from every dep, go inactive. No dep can
    /// reach an inactive watcher afterwards.
    pub fn teardown(&self) {
        if !self.active.get() {
            return;
        }
        if let Some(scope) = self.scope.upgrade() {
            if !scope.is_being_destroyed() {
                scope.remove_watcher(self.id);
            }
        }
        let deps: Vec<Rc<Dep>> = self.deps.borrow().clone();
        for dep in deps {
            dep.remove_sub(self.id);
        }
        self.active.set(false);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::record::Record;
    use std::cell::Cell;

    fn scope_with(entries: &[(&str, Value)]) -> Scope {
        let record = Record::new();
        for (key, value) in entries {
            record.set(key, value.clone());
        }
        Scope::new(Value::Record(record))
    }

    fn read_root(scope: &Scope, key: &str) -> Value {
        scope.data().as_record().unwrap().get(key)
    }

    #[test]
    fn eager_watcher_evaluates_on_construction() {
        let scope = scope_with(&[("a", Value::from(2))]);
        let watcher = Watcher::new(
            &scope,
            WatchSource::func(|s| read_root(s, "a")),
            |_, _, _| {},
            WatcherOptions::default(),
            false,
        );

        assert_eq!(watcher.value().as_num(), Some(2.0));
        assert_eq!(watcher.dep_count(), 1);
        assert_eq!(watcher.new_dep_count(), 0);
    }

    #[test]
    fn lazy_watcher_waits_for_evaluate() {
        let scope = scope_with(&[("a", Value::from(2))]);
        let watcher = Watcher::new(
            &scope,
            WatchSource::func(|s| read_root(s, "a")),
            |_, _, _| {},
            WatcherOptions {
                lazy: true,
                ..Default::default()
            },
            false,
        );

        assert!(watcher.is_dirty());
        assert!(watcher.value().is_null());
        assert_eq!(watcher.dep_count(), 0);

        watcher.evaluate();
        assert!(!watcher.is_dirty());
        assert_eq!(watcher.value().as_num(), Some(2.0));
        assert_eq!(watcher.dep_count(), 1);
    }

    #[test]
    fn sync_watcher_fires_inside_notify() {
        let scope = scope_with(&[("a", Value::from(1))]);
        let fired = Rc::new(Cell::new(0));

        let count = fired.clone();
        let _watcher = Watcher::new(
            &scope,
            WatchSource::func(|s| read_root(s, "a")),
            move |_, new, old| {
                count.set(count.get() + 1);
                assert_eq!(new.as_num(), Some(5.0));
                assert_eq!(old.as_num(), Some(1.0));
            },
            WatcherOptions {
                sync: true,
                ..Default::default()
            },
            false,
        );

        scope.data().as_record().unwrap().set("a", Value::from(5));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn equal_write_does_not_notify() {
        let scope = scope_with(&[("a", Value::from(1)), ("n", Value::from(f64::NAN))]);
        let fired = Rc::new(Cell::new(0));

        let count = fired.clone();
        let _watcher = Watcher::new(
            &scope,
            WatchSource::func(|s| {
                let _ = read_root(s, "n");
                read_root(s, "a")
            }),
            move |_, _, _| count.set(count.get() + 1),
            WatcherOptions {
                sync: true,
                ..Default::default()
            },
            false,
        );

        let record = scope.data();
        let record = record.as_record().unwrap();
        record.set("a", Value::from(1));
        record.set("n", Value::from(f64::NAN));
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn stale_deps_are_pruned_on_reevaluation() {
        let scope = scope_with(&[
            ("flag", Value::from(true)),
            ("a", Value::from(1)),
            ("b", Value::from(1)),
        ]);
        let watcher = Watcher::new(
            &scope,
            WatchSource::func(|s| {
                if read_root(s, "flag").as_bool().unwrap_or(false) {
                    read_root(s, "a")
                } else {
                    read_root(s, "b")
                }
            }),
            |_, _, _| {},
            WatcherOptions {
                sync: true,
                ..Default::default()
            },
            false,
        );

        let record = scope.data();
        let record = record.as_record().unwrap();
        let dep_a = record.slot_dep("a").unwrap();
        let dep_b = record.slot_dep("b").unwrap();

        assert!(dep_a.has_sub(watcher.id()));
        assert!(!dep_b.has_sub(watcher.id()));

        record.set("flag", Value::from(false));

        assert!(!dep_a.has_sub(watcher.id()));
        assert!(dep_b.has_sub(watcher.id()));
    }

    #[test]
    fn teardown_unsubscribes_everywhere() {
        let scope = scope_with(&[("a", Value::from(1))]);
        let fired = Rc::new(Cell::new(0));

        let count = fired.clone();
        let watcher = Watcher::new(
            &scope,
            WatchSource::func(|s| read_root(s, "a")),
            move |_, _, _| count.set(count.get() + 1),
            WatcherOptions {
                sync: true,
                ..Default::default()
            },
            false,
        );

        let record = scope.data();
        let record = record.as_record().unwrap();
        let dep = record.slot_dep("a").unwrap();
        assert_eq!(scope.watcher_count(), 1);

        watcher.teardown();
        assert!(!watcher.is_active());
        assert_eq!(scope.watcher_count(), 0);
        assert!(!dep.has_sub(watcher.id()));

        record.set("a", Value::from(99));
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn invalid_path_becomes_a_noop_getter() {
        let scope = scope_with(&[("a", Value::from(1))]);
        let watcher = Watcher::new(
            &scope,
            WatchSource::from("a[0].b"),
            |_, _, _| {},
            WatcherOptions::default(),
            false,
        );

        assert!(watcher.value().is_null());
        assert_eq!(watcher.dep_count(), 0);
        assert_eq!(watcher.expression(), "a[0].b");
    }

    #[test]
    fn path_watcher_tracks_the_walked_slots() {
        let inner = Record::new();
        inner.set("b", Value::from(7));
        let outer = Record::new();
        outer.set("a", Value::Record(inner));
        let scope = Scope::new(Value::Record(outer));

        let fired = Rc::new(Cell::new(0));
        let count = fired.clone();
        let watcher = Watcher::new(
            &scope,
            WatchSource::from("a.b"),
            move |_, _, _| count.set(count.get() + 1),
            WatcherOptions {
                sync: true,
                ..Default::default()
            },
            false,
        );
        assert_eq!(watcher.value().as_num(), Some(7.0));

        let a = read_root(&scope, "a");
        a.as_record().unwrap().set("b", Value::from(8));
        assert_eq!(fired.get(), 1);
        assert_eq!(watcher.value().as_num(), Some(8.0));
    }

    #[test]
    fn nested_evaluation_restores_the_outer_target() {
        // a lazy watcher read from inside an eager watcher's getter
        let scope = scope_with(&[("x", Value::from(3)), ("y", Value::from(4))]);
        let lazy_runs = Rc::new(Cell::new(0));

        let runs = lazy_runs.clone();
        let lazy = Watcher::new(
            &scope,
            WatchSource::func(move |s| {
                runs.set(runs.get() + 1);
                Value::from(read_root(s, "x").as_num().unwrap_or(0.0) * 2.0)
            }),
            |_, _, _| {},
            WatcherOptions {
                lazy: true,
                ..Default::default()
            },
            false,
        );

        let lazy_for_getter = lazy.clone();
        let eager = Watcher::new(
            &scope,
            WatchSource::func(move |s| {
                let left = lazy_for_getter.cached_value().as_num().unwrap_or(0.0);
                let right = read_root(s, "y").as_num().unwrap_or(0.0);
                Value::from(left + right)
            }),
            |_, _, _| {},
            WatcherOptions {
                sync: true,
                ..Default::default()
            },
            false,
        );

        assert_eq!(eager.value().as_num(), Some(10.0));
        // the eager watcher depends on x (through the lazy chain) and y
        assert_eq!(eager.dep_count(), 2);
        assert_eq!(lazy_runs.get(), 1);

        scope.data().as_record().unwrap().set("x", Value::from(5));
        // the eager re-run re-evaluated the lazy watcher exactly once
        assert_eq!(lazy_runs.get(), 2);
        assert!(!lazy.is_dirty());
        assert_eq!(eager.value().as_num(), Some(14.0));
        assert_eq!(lazy.value().as_num(), Some(10.0));
    }
}
