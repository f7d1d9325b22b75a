// ============================================================================
// pulse-reactive - Equality
// Strict-equality semantics for change detection
// ============================================================================

use crate::core::value::Value;

// =============================================================================
// SAME VALUE
// =============================================================================

/// Strict equality between two values.
///
/// Primitives compare by content, containers and nodes by pointer identity.
/// The one deliberate departure from IEEE 754: NaN equals NaN, so a setter
/// that replaces NaN with NaN does not notify.
///
/// # Example
/// ```
/// use pulse_reactive::reactivity::equality::same_value;
/// use pulse_reactive::core::value::Value;
///
/// assert!(same_value(&Value::from(1), &Value::from(1)));
/// assert!(same_value(&Value::from(f64::NAN), &Value::from(f64::NAN)));
/// assert!(!same_value(&Value::from(1), &Value::from("1")));
/// ```
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Num(x), Value::Num(y)) => same_f64(*x, *y),
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Record(x), Value::Record(y)) => x.ptr_eq(y),
        (Value::Seq(x), Value::Seq(y)) => x.ptr_eq(y),
        (Value::Node(x), Value::Node(y)) => x.ptr_eq(y),
        _ => false,
    }
}

/// f64 equality with NaN equal to NaN.
pub fn same_f64(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

// =============================================================================
// TESTS
// =============================================================================
