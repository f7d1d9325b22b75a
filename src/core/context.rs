// ============================================================================
// pulse-reactive - Reactive Context
// Thread-local state: the target stack, observation gate, id counters
// ============================================================================
//
// All reactivity state is single-threaded by design, so the globals live in
// one thread-local struct. The target stack names the watcher currently
// evaluating its getter; property reads attribute themselves to its top.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::primitives::watcher::Watcher;

// =============================================================================
// REACTIVE CONTEXT
// =============================================================================

/// Thread-local reactive context holding the process-wide reactivity state.
pub struct ReactiveContext {
    /// Watcher currently collecting dependencies (top of the stack).
    target: RefCell<Option<Rc<Watcher>>>,

    /// Stack of evaluating watchers. `None` entries suppress tracking
    /// entirely (used while running user-supplied data factories).
    target_stack: RefCell<Vec<Option<Rc<Watcher>>>>,

    /// Gate for new observer creation. Toggled off transiently, e.g. while
    /// installing non-root props on a child scope.
    should_observe: Cell<bool>,

    /// When false, flushes run inline and notify dispatches in id order.
    async_mode: Cell<bool>,

    /// Monotonic id counters.
    dep_uid: Cell<u64>,
    watcher_uid: Cell<u64>,
    scope_uid: Cell<u64>,
}

impl ReactiveContext {
    fn new() -> Self {
        Self {
            target: RefCell::new(None),
            target_stack: RefCell::new(Vec::new()),
            should_observe: Cell::new(true),
            async_mode: Cell::new(true),
            dep_uid: Cell::new(0),
            watcher_uid: Cell::new(0),
            scope_uid: Cell::new(0),
        }
    }

    pub fn current_target(&self) -> Option<Rc<Watcher>> {
        self.target.borrow().clone()
    }

    pub fn has_target(&self) -> bool {
        self.target.borrow().is_some()
    }

    pub fn push_target(&self, watcher: Option<Rc<Watcher>>) {
        self.target_stack.borrow_mut().push(watcher.clone());
        *self.target.borrow_mut() = watcher;
    }

    pub fn pop_target(&self) {
        let mut stack = self.target_stack.borrow_mut();
        stack.pop();
        *self.target.borrow_mut() = stack.last().cloned().flatten();
    }

    pub fn should_observe(&self) -> bool {
        self.should_observe.get()
    }

    pub fn set_should_observe(&self, value: bool) {
        self.should_observe.set(value);
    }

    pub fn is_async(&self) -> bool {
        self.async_mode.get()
    }

    pub fn set_async(&self, value: bool) {
        self.async_mode.set(value);
    }

    pub fn next_dep_id(&self) -> u64 {
        let id = self.dep_uid.get();
        self.dep_uid.set(id + 1);
        id
    }

    pub fn next_watcher_id(&self) -> u64 {
        let id = self.watcher_uid.get();
        self.watcher_uid.set(id + 1);
        id
    }

    pub fn next_scope_id(&self) -> u64 {
        let id = self.scope_uid.get();
        self.scope_uid.set(id + 1);
        id
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    static CONTEXT: ReactiveContext = ReactiveContext::new();
}

/// Access the thread-local reactive context.
pub fn with_context<R>(f: impl FnOnce(&ReactiveContext) -> R) -> R {
    CONTEXT.with(f)
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// The watcher currently on top of the target stack, if any.
pub fn current_target() -> Option<Rc<Watcher>> {
    with_context(|ctx| ctx.current_target())
}

/// True when a watcher is collecting dependencies right now.
pub fn has_target() -> bool {
    with_context(|ctx| ctx.has_target())
}

/// Designate `watcher` as the active dependency-collection target.
/// Pass `None` to suppress tracking for the duration of the push.
pub fn push_target(watcher: Option<Rc<Watcher>>) {
    with_context(|ctx| ctx.push_target(watcher));
}

/// Restore the previous target.
pub fn pop_target() {
    with_context(|ctx| ctx.pop_target());
}

/// Gate or un-gate new observer creation.
pub fn toggle_observing(value: bool) {
    with_context(|ctx| ctx.set_should_observe(value));
}

/// Whether `observe` may currently create observers.
pub fn should_observe() -> bool {
    with_context(|ctx| ctx.should_observe())
}

/// Whether flushes are deferred to the host task queue (default) or run
/// inline.
pub fn is_async() -> bool {
    with_context(|ctx| ctx.is_async())
}

/// Switch between deferred and inline flushing.
pub fn set_async(value: bool) {
    with_context(|ctx| ctx.set_async(value));
}

// =============================================================================
// TESTS
// =============================================================================
