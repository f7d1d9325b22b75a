// ============================================================================
// pulse-reactive - Scope
// The minimal owner surface the core needs from a component instance
// ============================================================================
//
// Instance management proper lives with the host. A scope is just what the
// reactivity core must see of it: the observed root record, the watcher
// list, the render-watcher designation, and the mounted/active/destroyed
// flags the scheduler consults when delivering lifecycle callbacks.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::context::with_context;
use crate::core::value::Value;
use crate::primitives::watcher::Watcher;
use crate::reactivity::observe::observe;

// =============================================================================
// SCOPE
// =============================================================================

/// A cheap, identity-comparable handle on a scope.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

pub(crate) struct ScopeInner {
    id: u64,
    root: RefCell<Value>,
    watchers: RefCell<Vec<Rc<Watcher>>>,
    render_watcher: RefCell<Option<Weak<Watcher>>>,
    mounted: Cell<bool>,
    active: Cell<bool>,
    being_destroyed: Cell<bool>,
    destroyed: Cell<bool>,
}

impl ScopeInner {
    pub(crate) fn is_being_destroyed(&self) -> bool {
        self.being_destroyed.get()
    }

    pub(crate) fn remove_watcher(&self, watcher_id: u64) {
        self.watchers.borrow_mut().retain(|w| w.id() != watcher_id);
    }
}

impl Scope {
    /// Create a scope over `root`, observing it as root data.
    pub fn new(root: Value) -> Scope {
        observe(&root, true);
        Scope {
            inner: Rc::new(ScopeInner {
                id: with_context(|ctx| ctx.next_scope_id()),
                root: RefCell::new(root),
                watchers: RefCell::new(Vec::new()),
                render_watcher: RefCell::new(None),
                mounted: Cell::new(false),
                active: Cell::new(true),
                being_destroyed: Cell::new(false),
                destroyed: Cell::new(false),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<ScopeInner>) -> Scope {
        Scope { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ScopeInner> {
        Rc::downgrade(&self.inner)
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The observed root record (or whatever value was supplied).
    pub fn data(&self) -> Value {
        self.inner.root.borrow().clone()
    }

    // =========================================================================
    // WATCHER LIST
    // =========================================================================

    pub(crate) fn register_watcher(&self, watcher: &Rc<Watcher>, is_render: bool) {
        self.inner.watchers.borrow_mut().push(watcher.clone());
        if is_render {
            *self.inner.render_watcher.borrow_mut() = Some(Rc::downgrade(watcher));
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.borrow().len()
    }

    pub fn render_watcher(&self) -> Option<Rc<Watcher>> {
        self.inner
            .render_watcher
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
    }

    // =========================================================================
    // LIFECYCLE FLAGS
    // =========================================================================

    pub fn set_mounted(&self, value: bool) {
        self.inner.mounted.set(value);
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    pub fn set_active(&self, value: bool) {
        self.inner.active.set(value);
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Tear down every watcher owned by this scope. Watchers skip the
    /// individual list removal while the scope is being destroyed; the list
    /// is dropped wholesale afterwards.
    pub fn destroy(&self) {
        if self.inner.destroyed.get() {
            return;
        }
        self.inner.being_destroyed.set(true);

        let watchers: Vec<Rc<Watcher>> = self.inner.watchers.borrow().clone();
        for watcher in watchers {
            watcher.teardown();
        }
        self.inner.watchers.borrow_mut().clear();
        *self.inner.render_watcher.borrow_mut() = None;

        self.inner.destroyed.set(true);
    }
}

// =============================================================================
// TESTS
// =============================================================================
