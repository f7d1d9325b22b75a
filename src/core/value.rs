// ============================================================================
// pulse-reactive - Value Model
// The dynamic value type flowing through the reactive graph
// ============================================================================
//
// Observation only applies to records and sequences. Primitives are plain
// data, and `Node` is an opaque host object (a rendered tree node, a
// component handle) that the observer machinery must never wrap.
//
// Identity semantics mirror strict equality: primitives compare by value
// (with NaN equal to NaN, see reactivity::equality), containers and nodes
// compare by pointer identity.
// ============================================================================

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::collections::record::Record;
use crate::collections::sequence::Sequence;
use crate::reactivity::observe::Observer;

// =============================================================================
// NODE REF
// =============================================================================

/// An opaque, pass-through host object. Reads and writes of a `Node` value
/// never register dependencies or send notifications.
#[derive(Clone)]
pub struct NodeRef {
    inner: Rc<dyn Any>,
}

impl NodeRef {
    pub fn new(value: impl Any) -> Self {
        Self {
            inner: Rc::new(value),
        }
    }

    /// Pointer identity, the only equality a node has.
    pub fn ptr_eq(&self, other: &NodeRef) -> bool {
        Rc::as_ptr(&self.inner) as *const () == Rc::as_ptr(&other.inner) as *const ()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({:p})", Rc::as_ptr(&self.inner))
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// A dynamic value. Cloning is cheap: containers and strings are
/// reference-counted handles.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Num(f64),
    Str(Rc<str>),
    Record(Record),
    Seq(Sequence),
    Node(NodeRef),
}

impl Value {
    /// True for the two observable container shapes.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Record(_) | Value::Seq(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The observer attached to this value, when it is an observed container.
    pub fn observer(&self) -> Option<Rc<Observer>> {
        match self {
            Value::Record(r) => r.observer(),
            Value::Seq(s) => s.observer(),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&Sequence> {
        match self {
            Value::Seq(s) => Some(s),
            _ => None,
        }
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Num(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Num(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Num(v as f64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Num(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Rc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Rc::from(v.as_str()))
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl From<Sequence> for Value {
    fn from(v: Sequence) -> Self {
        Value::Seq(v)
    }
}

impl From<NodeRef> for Value {
    fn from(v: NodeRef) -> Self {
        Value::Node(v)
    }
}

// =============================================================================
// TESTS
// =============================================================================
