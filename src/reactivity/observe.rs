// ============================================================================
// pulse-reactive - Observer
// Turning containers into observable values
// ============================================================================
//
// One observer per container, created at most once. The observer owns the
// structural dep, the channel that fires when the container changes shape
// (key add/remove, splice) rather than when an existing slot's value moves.
// ============================================================================

use std::cell::Cell;
use std::rc::Rc;

use tracing::warn;

use crate::collections::record::{DiagnosticHook, Record};
use crate::collections::sequence::Sequence;
use crate::core::context::should_observe;
use crate::core::value::Value;
use crate::reactivity::dep::Dep;
use crate::shared::host::is_server_rendering;

// =============================================================================
// OBSERVER
// =============================================================================

/// The per-container observation record: the structural dep plus the count
/// of scopes using this container as their root record.
pub struct Observer {
    dep: Rc<Dep>,
    vm_count: Cell<u32>,
}

impl Observer {
    fn new() -> Rc<Observer> {
        Rc::new(Observer {
            dep: Dep::new(),
            vm_count: Cell::new(0),
        })
    }

    /// The structural dep.
    pub fn dep(&self) -> &Rc<Dep> {
        &self.dep
    }

    /// How many scopes hold this container as their root record.
    pub fn vm_count(&self) -> u32 {
        self.vm_count.get()
    }
}

// =============================================================================
// OBSERVE
// =============================================================================

/// Attach an observer to a container, idempotently.
///
/// Primitives, opaque nodes, and non-extensible containers pass through
/// untouched. The `should_observe` gate and the host's server-rendering
/// flag are honored at the moment of the call; an already-observed value
/// always returns its existing observer regardless of either.
pub fn observe(value: &Value, as_root: bool) -> Option<Rc<Observer>> {
    let ob = match value {
        Value::Record(record) => observe_record(record),
        Value::Seq(seq) => observe_sequence(seq),
        _ => None,
    };
    if as_root {
        if let Some(ob) = &ob {
            ob.vm_count.set(ob.vm_count.get() + 1);
        }
    }
    ob
}

fn may_create(extensible: bool) -> bool {
    should_observe() && !is_server_rendering() && extensible
}

fn observe_record(record: &Record) -> Option<Rc<Observer>> {
    if let Some(ob) = record.observer() {
        return Some(ob);
    }
    if !may_create(record.is_extensible()) {
        return None;
    }

    // Attach before walking so self-referential records terminate.
    let ob = Observer::new();
    record.set_observer(ob.clone());
    for key in record.keys() {
        define_reactive(record, &key, None, None, false);
    }
    Some(ob)
}

fn observe_sequence(seq: &Sequence) -> Option<Rc<Observer>> {
    if let Some(ob) = seq.observer() {
        return Some(ob);
    }
    if !may_create(seq.is_extensible()) {
        return None;
    }

    let ob = Observer::new();
    seq.set_observer(ob.clone());
    for item in seq.raw_values() {
        observe(&item, false);
    }
    Some(ob)
}

// =============================================================================
// DEFINE REACTIVE
// =============================================================================

/// Install a reactive slot on a record: a fresh dep, optional diagnostic
/// setter hook, and (unless shallow) observation of the child value.
/// Abstains silently when the slot is non-configurable.
pub fn define_reactive(
    record: &Record,
    key: &str,
    val: Option<Value>,
    custom_setter: Option<DiagnosticHook>,
    shallow: bool,
) {
    if let Some(child) = record.ensure_reactive_slot(key, val, custom_setter, shallow) {
        if !shallow {
            observe(&child, false);
        }
    }
}

/// Register the structural dep of every element of a sequence with the
/// current target, recursing one level into nested sequences and no
/// further. Element reads on sequences have no per-slot accessors, so a
/// watcher that read the container must subscribe to the elements' shape
/// channels here.
pub(crate) fn depend_sequence(seq: &Sequence) {
    depend_sequence_at(seq, 0);
}

fn depend_sequence_at(seq: &Sequence, depth: u32) {
    for item in seq.raw_values() {
        if let Some(ob) = item.observer() {
            ob.dep().depend();
        }
        if depth == 0 {
            if let Value::Seq(inner) = &item {
                depend_sequence_at(inner, depth + 1);
            }
        }
    }
}

// =============================================================================
// STRUCTURAL SET / DEL
// =============================================================================

/// A structural key: a record field or a sequence index. Field keys that
/// parse as an index are treated as indices on sequences, and indices are
/// treated as decimal field keys on records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemberKey {
    Index(usize),
    Field(String),
}

impl From<usize> for MemberKey {
    fn from(i: usize) -> Self {
        MemberKey::Index(i)
    }
}

impl From<&str> for MemberKey {
    fn from(k: &str) -> Self {
        MemberKey::Field(k.to_string())
    }
}

impl From<String> for MemberKey {
    fn from(k: String) -> Self {
        MemberKey::Field(k)
    }
}

/// Add (or overwrite) a structural member reactively.
///
/// Per-slot accessors only catch writes to existing keys; this is the
/// entry point that makes additions visible, by installing the new slot
/// and firing the container's structural dep. Sequence indices route
/// through `splice` so the mutation takes the intercepted path and
/// notifies exactly once.
pub fn set(target: &Value, key: impl Into<MemberKey>, value: Value) -> Value {
    match (target, normalize_key(target, key.into())) {
        (Value::Seq(seq), MemberKey::Index(index)) => {
            seq.pad_to(index);
            seq.splice(index, 1, vec![value.clone()]);
            value
        }
        (Value::Record(record), MemberKey::Field(field)) => {
            if record.has_key(&field) {
                record.set(&field, value.clone());
                return value;
            }
            let ob = record.observer();
            if let Some(ob) = &ob {
                if ob.vm_count() > 0 {
                    warn!(
                        key = %field,
                        "refusing to add a reactive key to a root record; declare root keys up front"
                    );
                    return value;
                }
            }
            match ob {
                None => record.set(&field, value.clone()),
                Some(ob) => {
                    define_reactive(record, &field, Some(value.clone()), None, false);
                    ob.dep().notify();
                }
            }
            value
        }
        _ => {
            warn!("cannot add a reactive member to a primitive or opaque value");
            value
        }
    }
}

/// Remove a structural member reactively, firing the structural dep.
pub fn del(target: &Value, key: impl Into<MemberKey>) {
    match (target, normalize_key(target, key.into())) {
        (Value::Seq(seq), MemberKey::Index(index)) => {
            seq.splice(index, 1, Vec::new());
        }
        (Value::Record(record), MemberKey::Field(field)) => {
            let ob = record.observer();
            if let Some(ob) = &ob {
                if ob.vm_count() > 0 {
                    warn!(
                        key = %field,
                        "refusing to remove a reactive key from a root record"
                    );
                    return;
                }
            }
            if !record.has_key(&field) {
                return;
            }
            record.remove(&field);
            if let Some(ob) = ob {
                ob.dep().notify();
            }
        }
        _ => {
            warn!("cannot remove a reactive member from a primitive or opaque value");
        }
    }
}

fn normalize_key(target: &Value, key: MemberKey) -> MemberKey {
    match (target, key) {
        (Value::Seq(_), MemberKey::Field(f)) => match f.parse::<usize>() {
            Ok(i) => MemberKey::Index(i),
            Err(_) => MemberKey::Field(f),
        },
        (Value::Record(_), MemberKey::Index(i)) => MemberKey::Field(i.to_string()),
        (_, key) => key,
    }
}

// =============================================================================
// TESTS
// =============================================================================
