// ============================================================================
// pulse-reactive - Path Getters
// Compile a dotted path into a safe accessor over a scope's root record
// ============================================================================

use std::rc::Rc;

use crate::core::value::Value;
use crate::primitives::scope::Scope;

/// Parse `"a.b.c"` into a getter that walks the scope's root record through
/// the reactive read path. Returns `None` when the path contains anything
/// other than identifier characters, `$`, and dots.
pub fn parse_path(path: &str) -> Option<Rc<dyn Fn(&Scope) -> Value>> {
    let valid = path
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.');
    if !valid {
        return None;
    }

    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    Some(Rc::new(move |scope: &Scope| {
        let mut current = scope.data();
        for segment in &segments {
            match current {
                Value::Record(record) => current = record.get(segment),
                _ => return Value::Null,
            }
        }
        current
    }))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::record::Record;

    fn nested_scope() -> Scope {
        let inner = Record::new();
        inner.set("b", Value::from(42));

        let outer = Record::new();
        outer.set("a", Value::Record(inner));

        Scope::new(Value::Record(outer))
    }

    #[test]
    fn resolves_nested_segments() {
        let scope = nested_scope();
        let getter = parse_path("a.b").unwrap();
        assert_eq!(getter(&scope).as_num(), Some(42.0));
    }

    #[test]
    fn missing_segments_resolve_to_null() {
        let scope = nested_scope();
        let getter = parse_path("a.zzz.deep").unwrap();
        assert!(getter(&scope).is_null());
    }

    #[test]
    fn walking_through_a_primitive_resolves_to_null() {
        let scope = nested_scope();
        let getter = parse_path("a.b.c").unwrap();
        assert!(getter(&scope).is_null());
    }

    #[test]
    fn rejects_non_identifier_segments() {
        assert!(parse_path("a.b-c").is_none());
        assert!(parse_path("a[0]").is_none());
        assert!(parse_path("a b").is_none());
        assert!(parse_path("ok.$ref.x_1").is_some());
    }
}
