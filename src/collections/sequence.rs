// ============================================================================
// pulse-reactive - Sequence
// An ordered container whose mutating operations are intercepted
// ============================================================================
//
// The seven shape-changing operations (push, pop, unshift, shift, splice,
// sort_by, reverse) observe any newly introduced elements and fire the
// sequence's structural dep. Reads register the structural dep when a
// watcher is evaluating. `store` is the deliberate hole: it mirrors direct
// index assignment and notifies nobody — callers who want a reactive
// index write go through `observe::set`, which routes through `splice`.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::core::context::has_target;
use crate::core::value::Value;
use crate::reactivity::observe::{observe, Observer};

// =============================================================================
// SEQUENCE
// =============================================================================

/// A reference-counted sequence handle. Clones share storage and compare by
/// pointer identity.
#[derive(Clone)]
pub struct Sequence {
    inner: Rc<SequenceInner>,
}

struct SequenceInner {
    items: RefCell<Vec<Value>>,
    observer: RefCell<Option<Rc<Observer>>>,
    extensible: Cell<bool>,
}

impl Sequence {
    pub fn new() -> Sequence {
        Self::from_values(Vec::new())
    }

    pub fn from_values(items: Vec<Value>) -> Sequence {
        Sequence {
            inner: Rc::new(SequenceInner {
                items: RefCell::new(items),
                observer: RefCell::new(None),
                extensible: Cell::new(true),
            }),
        }
    }

    pub fn ptr_eq(&self, other: &Sequence) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn prevent_extensions(&self) {
        self.inner.extensible.set(false);
    }

    pub fn is_extensible(&self) -> bool {
        self.inner.extensible.get()
    }

    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.inner.observer.borrow().clone()
    }

    pub(crate) fn set_observer(&self, observer: Rc<Observer>) {
        *self.inner.observer.borrow_mut() = Some(observer);
    }

    // =========================================================================
    // READS
    // =========================================================================

    fn track_shape(&self) {
        if has_target() {
            if let Some(ob) = self.observer() {
                ob.dep().depend();
            }
        }
    }

    /// Length; subscribes the evaluating watcher to shape changes.
    pub fn len(&self) -> usize {
        self.track_shape();
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element read; subscribes the evaluating watcher to shape changes.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.track_shape();
        self.inner.items.borrow().get(index).cloned()
    }

    /// Snapshot of the elements; subscribes to shape changes.
    pub fn to_vec(&self) -> Vec<Value> {
        self.track_shape();
        self.inner.items.borrow().clone()
    }

    /// Untracked snapshot, for traversal internals.
    pub(crate) fn raw_values(&self) -> Vec<Value> {
        self.inner.items.borrow().clone()
    }

    pub(crate) fn raw_len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    // =========================================================================
    // THE UNINTERCEPTED WRITE
    // =========================================================================

    /// Direct index assignment: writes in place, extends with `Null` holes
    /// past the end, and notifies nobody.
    pub fn store(&self, index: usize, value: Value) {
        let mut items = self.inner.items.borrow_mut();
        if index >= items.len() {
            items.resize(index + 1, Value::Null);
        }
        items[index] = value;
    }

    /// Extend with `Null` holes so that `len >= target_len`. Untracked; used
    /// by the index form of `observe::set` before it routes through
    /// `splice`.
    pub(crate) fn pad_to(&self, target_len: usize) {
        let mut items = self.inner.items.borrow_mut();
        if items.len() < target_len {
            items.resize(target_len, Value::Null);
        }
    }

    // =========================================================================
    // INTERCEPTED MUTATORS
    // =========================================================================

    fn after_mutation(&self, inserted: &[Value]) {
        if let Some(ob) = self.observer() {
            for value in inserted {
                observe(value, false);
            }
            ob.dep().notify();
        }
    }

    pub fn push(&self, value: Value) {
        self.inner.items.borrow_mut().push(value.clone());
        self.after_mutation(std::slice::from_ref(&value));
    }

    pub fn pop(&self) -> Option<Value> {
        let removed = self.inner.items.borrow_mut().pop();
        self.after_mutation(&[]);
        removed
    }

    pub fn unshift(&self, value: Value) {
        self.inner.items.borrow_mut().insert(0, value.clone());
        self.after_mutation(std::slice::from_ref(&value));
    }

    pub fn shift(&self) -> Option<Value> {
        let removed = {
            let mut items = self.inner.items.borrow_mut();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        self.after_mutation(&[]);
        removed
    }

    /// Remove `delete_count` elements at `start` (both clamped) and insert
    /// `new_items` in their place. Returns the removed elements.
    pub fn splice(&self, start: usize, delete_count: usize, new_items: Vec<Value>) -> Vec<Value> {
        let removed: Vec<Value> = {
            let mut items = self.inner.items.borrow_mut();
            let len = items.len();
            let start = start.min(len);
            let end = (start + delete_count).min(len);
            items.splice(start..end, new_items.iter().cloned()).collect()
        };
        self.after_mutation(&new_items);
        removed
    }

    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) {
        self.inner.items.borrow_mut().sort_by(compare);
        self.after_mutation(&[]);
    }

    pub fn reverse(&self) {
        self.inner.items.borrow_mut().reverse();
        self.after_mutation(&[]);
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sequence[len={}]", self.raw_len())
    }
}

// =============================================================================
// TESTS
// =============================================================================
