// ============================================================================
// pulse-reactive - Record
// An insertion-ordered, string-keyed container with reactive property slots
// ============================================================================
//
// A record starts as a plain container. Observation (reactivity::observe)
// upgrades each property slot with a dep; from then on reads attribute
// themselves to the evaluating watcher and non-equal writes broadcast.
//
// Borrow discipline: slot machinery is cloned out under a short borrow
// before any user getter/setter or dep runs, because those can read or
// write this very record re-entrantly.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::core::context::has_target;
use crate::core::value::Value;
use crate::reactivity::dep::Dep;
use crate::reactivity::equality::same_value;
use crate::reactivity::observe::{depend_sequence, observe, Observer};

// =============================================================================
// PROPERTY SLOT
// =============================================================================

/// Original accessor hooks a slot may carry, the analogue of a pre-existing
/// property getter/setter.
pub type PropGetter = Rc<dyn Fn() -> Value>;
pub type PropSetter = Rc<dyn Fn(Value)>;

/// Diagnostic hook fired when a guarded slot is written (props written from
/// outside, reserved keys, and similar host-side complaints).
pub type DiagnosticHook = Rc<dyn Fn()>;

struct PropertySlot {
    key: Rc<str>,
    value: RefCell<Value>,
    getter: Option<PropGetter>,
    setter: Option<PropSetter>,
    /// Installed by `define_reactive`; `None` means the slot is plain.
    dep: Option<Rc<Dep>>,
    custom_setter: Option<DiagnosticHook>,
    shallow: bool,
    configurable: bool,
}

impl PropertySlot {
    fn plain(key: &str, value: Value) -> Self {
        Self {
            key: Rc::from(key),
            value: RefCell::new(value),
            getter: None,
            setter: None,
            dep: None,
            custom_setter: None,
            shallow: false,
            configurable: true,
        }
    }
}

// =============================================================================
// RECORD
// =============================================================================

/// A reference-counted record handle. Clones share the same storage and
/// compare equal by pointer identity.
#[derive(Clone)]
pub struct Record {
    inner: Rc<RecordInner>,
}

struct RecordInner {
    slots: RefCell<Vec<PropertySlot>>,
    observer: RefCell<Option<Rc<Observer>>>,
    extensible: Cell<bool>,
}

impl Record {
    pub fn new() -> Record {
        Record {
            inner: Rc::new(RecordInner {
                slots: RefCell::new(Vec::new()),
                observer: RefCell::new(None),
                extensible: Cell::new(true),
            }),
        }
    }

    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn len(&self) -> usize {
        self.inner.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.inner.slots.borrow().iter().any(|s| &*s.key == key)
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.inner
            .slots
            .borrow()
            .iter()
            .map(|s| s.key.clone())
            .collect()
    }

    /// Shape lock: once called, new keys are refused and `observe` will not
    /// wrap this record.
    pub fn prevent_extensions(&self) {
        self.inner.extensible.set(false);
    }

    pub fn is_extensible(&self) -> bool {
        self.inner.extensible.get()
    }

    /// Mark a slot as non-upgradeable; `define_reactive` abstains on it.
    pub fn seal_key(&self, key: &str) {
        let mut slots = self.inner.slots.borrow_mut();
        if let Some(slot) = slots.iter_mut().find(|s| &*s.key == key) {
            slot.configurable = false;
        }
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

    /// Reactive read. When a watcher is evaluating, reading a reactive slot
    /// subscribes the watcher to the slot's dep, to the child container's
    /// structural dep, and (for sequence children) to every element's
    /// structural dep.
    pub fn get(&self, key: &str) -> Value {
        let found = {
            let slots = self.inner.slots.borrow();
            slots.iter().find(|s| &*s.key == key).map(|s| {
                (
                    s.getter.clone(),
                    s.dep.clone(),
                    s.shallow,
                    s.value.borrow().clone(),
                )
            })
        };
        let Some((getter, dep, shallow, stored)) = found else {
            return Value::Null;
        };

        let value = match getter {
            Some(g) => g(),
            None => stored,
        };

        if let Some(dep) = dep {
            if has_target() {
                dep.depend();
                if !shallow {
                    if let Some(child_ob) = value.observer() {
                        child_ob.dep().depend();
                    }
                    if let Value::Seq(seq) = &value {
                        depend_sequence(seq);
                    }
                }
            }
        }

        value
    }

    /// Plain read: no dependency registration. Original getters still apply.
    pub fn raw_get(&self, key: &str) -> Option<Value> {
        let found = {
            let slots = self.inner.slots.borrow();
            slots
                .iter()
                .find(|s| &*s.key == key)
                .map(|s| (s.getter.clone(), s.value.borrow().clone()))
        };
        found.map(|(getter, stored)| match getter {
            Some(g) => g(),
            None => stored,
        })
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Write a key. Existing reactive slots run the full setter protocol:
    /// equality short-circuit (NaN equals NaN), diagnostic hook, read-only
    /// abstention for getter-without-setter slots, re-observation of the new
    /// child, then notification. A missing key is appended as a plain slot —
    /// structural additions only become reactive through `observe::set`.
    pub fn set(&self, key: &str, new_value: Value) {
        let found = {
            let slots = self.inner.slots.borrow();
            slots.iter().position(|s| &*s.key == key).map(|idx| {
                let s = &slots[idx];
                (
                    idx,
                    s.getter.clone(),
                    s.setter.clone(),
                    s.dep.clone(),
                    s.custom_setter.clone(),
                    s.shallow,
                    s.value.borrow().clone(),
                )
            })
        };

        match found {
            None => {
                if !self.inner.extensible.get() {
                    return;
                }
                self.inner
                    .slots
                    .borrow_mut()
                    .push(PropertySlot::plain(key, new_value));
            }
            Some((idx, getter, setter, dep, custom_setter, shallow, stored)) => {
                let current = match &getter {
                    Some(g) => g(),
                    None => stored,
                };
                if same_value(&new_value, &current) {
                    return;
                }
                if let Some(hook) = custom_setter {
                    hook();
                }
                // getter without setter: read-only slot
                if getter.is_some() && setter.is_none() {
                    return;
                }
                match setter {
                    Some(s) => s(new_value.clone()),
                    None => {
                        let slots = self.inner.slots.borrow();
                        *slots[idx].value.borrow_mut() = new_value.clone();
                    }
                }
                if let Some(dep) = dep {
                    if !shallow {
                        observe(&new_value, false);
                    }
                    dep.notify();
                }
            }
        }
    }

    /// Install an accessor slot (computed-style property). Replaces the
    /// hooks of an existing configurable slot.
    pub fn define_accessor(
        &self,
        key: &str,
        getter: Option<PropGetter>,
        setter: Option<PropSetter>,
    ) {
        let mut slots = self.inner.slots.borrow_mut();
        if let Some(slot) = slots.iter_mut().find(|s| &*s.key == key) {
            if !slot.configurable {
                return;
            }
            slot.getter = getter;
            slot.setter = setter;
        } else if self.inner.extensible.get() {
            let mut slot = PropertySlot::plain(key, Value::Null);
            slot.getter = getter;
            slot.setter = setter;
            slots.push(slot);
        }
    }

    /// Remove a key outright. Plain removal: notification is
    /// `observe::del`'s job.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut slots = self.inner.slots.borrow_mut();
        let idx = slots.iter().position(|s| &*s.key == key)?;
        let slot = slots.remove(idx);
        Some(slot.value.into_inner())
    }

    // =========================================================================
    // REACTIVE SLOT INSTALLATION
    // =========================================================================

    /// Attach a dep to a slot, creating the slot when absent. Abstains (and
    /// returns `None`) on non-configurable slots. Returns the child value the
    /// caller should observe.
    pub(crate) fn ensure_reactive_slot(
        &self,
        key: &str,
        val: Option<Value>,
        custom_setter: Option<DiagnosticHook>,
        shallow: bool,
    ) -> Option<Value> {
        let mut slots = self.inner.slots.borrow_mut();
        if let Some(slot) = slots.iter_mut().find(|s| &*s.key == key) {
            if !slot.configurable {
                return None;
            }
            // Slots with a getter and no setter stay lazy: their child is
            // whatever the getter produces at read time.
            let child = if slot.getter.is_none() || slot.setter.is_some() {
                match val {
                    Some(v) => {
                        *slot.value.borrow_mut() = v.clone();
                        v
                    }
                    None => slot.value.borrow().clone(),
                }
            } else {
                Value::Null
            };
            slot.dep = Some(Dep::new());
            slot.custom_setter = custom_setter;
            slot.shallow = shallow;
            Some(child)
        } else {
            let child = val.unwrap_or(Value::Null);
            let mut slot = PropertySlot::plain(key, child.clone());
            slot.dep = Some(Dep::new());
            slot.custom_setter = custom_setter;
            slot.shallow = shallow;
            slots.push(slot);
            Some(child)
        }
    }

    /// The dep installed on a slot, if the slot is reactive. Test and
    /// diagnostic surface.
    pub fn slot_dep(&self, key: &str) -> Option<Rc<Dep>> {
        self.inner
            .slots
            .borrow()
            .iter()
            .find(|s| &*s.key == key)
            .and_then(|s| s.dep.clone())
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self.keys();
        write!(f, "Record{{")?;
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", key)?;
        }
        write!(f, "}}")
    }
}

// =============================================================================
// TESTS
// =============================================================================
