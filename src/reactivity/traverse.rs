// ============================================================================
// pulse-reactive - Deep Traversal
// Touch every nested reactive property so deep watchers subscribe
// ============================================================================

use std::collections::HashSet;

use crate::core::value::Value;

/// Recursively read every property below `value` while a watcher is on the
/// target stack, subscribing that watcher to every nested dep.
///
/// Cycle safety: visited containers are remembered by structural dep id in
/// a seen-set that is fresh per call, so self-referential structures
/// terminate and one traversal cannot poison the next.
pub fn traverse(value: &Value) {
    let mut seen: HashSet<u64> = HashSet::new();
    traverse_inner(value, &mut seen);
}

fn traverse_inner(value: &Value, seen: &mut HashSet<u64>) {
    let frozen = match value {
        Value::Record(r) => !r.is_extensible(),
        Value::Seq(s) => !s.is_extensible(),
        // primitives and opaque nodes end the walk
        _ => return,
    };
    if frozen {
        return;
    }

    if let Some(ob) = value.observer() {
        if !seen.insert(ob.dep().id()) {
            return;
        }
    }

    match value {
        Value::Seq(seq) => {
            for item in seq.raw_values() {
                traverse_inner(&item, seen);
            }
        }
        Value::Record(record) => {
            for key in record.keys() {
                // reactive read: this is where the subscription happens
                let child = record.get(&key);
                traverse_inner(&child, seen);
            }
        }
        _ => {}
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::record::Record;
    use crate::collections::sequence::Sequence;
    use crate::reactivity::observe::{observe, set};

    #[test]
    fn traverse_handles_cycles() {
        let r = Record::new();
        r.set("x", Value::from(1));
        let value = Value::Record(r.clone());
        observe(&value, false);
        // tie the knot
        set(&value, "me", value.clone());

        // must terminate
        traverse(&value);
    }

    #[test]
    fn traverse_skips_frozen_containers() {
        let frozen = Record::new();
        frozen.set("x", Value::from(1));
        frozen.prevent_extensions();

        let r = Record::new();
        r.set("child", Value::Record(frozen));
        let value = Value::Record(r);
        observe(&value, false);

        traverse(&value);
    }

    #[test]
    fn traverse_walks_nested_sequences() {
        let inner = Sequence::from_values(vec![Value::from(1)]);
        let outer = Sequence::from_values(vec![Value::Seq(inner), Value::from(2)]);
        let value = Value::Seq(outer);
        observe(&value, false);

        traverse(&value);
    }
}
