//! Deep Observer (redesigned)
//!
//! Rust has no ambient mutable-reference interception, so instead of
//! wrapping every nested [`serde_json::Value`] in an observer cell, edits
//! go through [`crate::replicant::Replicant::update`], which diffs the
//! before/after snapshots. This module is that diff: it walks two values in
//! lockstep and emits the [`Change`] list that would turn the old one into
//! the new one (see SPEC_FULL.md, "Deep Observer (redesigned per §9)").

use crate::change::Change;
use serde_json::Value;

/// Produce the change-list that turns `old` into `new`.
///
/// Satisfies the round-trip law: `apply_changes(old, diff_values(old, new))
/// == new` and `reverse_changes(new, diff_values(old, new)) == old`.
pub fn diff_values(old: &Value, new: &Value) -> Vec<Change> {
    let mut changes = Vec::new();
    walk("", old, new, &mut changes);
    changes
}

fn walk(path: &str, old: &Value, new: &Value, out: &mut Vec<Change>) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for (k, old_v) in old_map {
                let child_path = join(path, k);
                match new_map.get(k) {
                    Some(new_v) => walk(&child_path, old_v, new_v, out),
                    None => out.push(Change::Delete {
                        path: child_path,
                        old_value: old_v.clone(),
                    }),
                }
            }
            for (k, new_v) in new_map {
                if !old_map.contains_key(k) {
                    out.push(Change::Add {
                        path: join(path, k),
                        new_value: new_v.clone(),
                    });
                }
            }
        }
        (Value::Array(old_arr), Value::Array(new_arr)) => {
            if let Some(splice) = diff_arrays(path, old_arr, new_arr) {
                out.push(splice);
            }
        }
        _ => out.push(Change::Update {
            path: path.to_string(),
            old_value: old.clone(),
            new_value: new.clone(),
        }),
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Diff two arrays into a single splice: the longest common prefix and
/// suffix are trimmed away, and the differing middle becomes one
/// `Change::Splice`. Producing one splice (rather than per-index updates)
/// is what makes scenario 4 of the protocol ("splice round trip") hold.
fn diff_arrays(path: &str, old: &[Value], new: &[Value]) -> Option<Change> {
    if old == new {
        return None;
    }

    let max_prefix = old.len().min(new.len());
    let prefix = (0..max_prefix)
        .take_while(|&i| old[i] == new[i])
        .count();

    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = (0..max_suffix)
        .take_while(|&i| old[old.len() - 1 - i] == new[new.len() - 1 - i])
        .count();

    let removed: Vec<Value> = old[prefix..old.len() - suffix].to_vec();
    let added: Vec<Value> = new[prefix..new.len() - suffix].to_vec();

    Some(Change::Splice {
        path: path.to_string(),
        index: prefix,
        removed_count: removed.len(),
        removed,
        added_count: added.len(),
        added,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{apply_changes, reverse_changes};
    use serde_json::json;

    fn assert_round_trip(old: Value, new: Value) {
        let changes = diff_values(&old, &new);
        assert_eq!(apply_changes(&old, &changes), new, "forward application mismatched");
        assert_eq!(reverse_changes(&new, &changes), old, "reverse application mismatched");
    }

    #[test]
    fn no_change_produces_empty_diff() {
        let v = json!({"a": 1});
        assert!(diff_values(&v, &v).is_empty());
    }

    #[test]
    fn added_key_produces_add() {
        let old = json!({});
        let new = json!({"a": 1});
        let changes = diff_values(&old, &new);
        assert_eq!(changes, vec![Change::Add { path: "a".into(), new_value: json!(1) }]);
        assert_round_trip(old, new);
    }

    #[test]
    fn removed_key_produces_delete() {
        let old = json!({"a": 1});
        let new = json!({});
        let changes = diff_values(&old, &new);
        assert_eq!(changes, vec![Change::Delete { path: "a".into(), old_value: json!(1) }]);
        assert_round_trip(old, new);
    }

    #[test]
    fn changed_scalar_produces_update() {
        let old = json!({"a": 1});
        let new = json!({"a": 2});
        let changes = diff_values(&old, &new);
        assert_eq!(
            changes,
            vec![Change::Update { path: "a".into(), old_value: json!(1), new_value: json!(2) }]
        );
        assert_round_trip(old, new);
    }

    #[test]
    fn nested_object_produces_nested_path() {
        let old = json!({"a": {"b": 1}});
        let new = json!({"a": {"b": 2}});
        let changes = diff_values(&old, &new);
        assert_eq!(changes[0].path(), "a.b");
        assert_round_trip(old, new);
    }

    #[test]
    fn array_middle_replacement_produces_single_splice() {
        // Spec §8 scenario 4: [10,20,30] -> [10,99,30].
        let old = json!([10, 20, 30]);
        let new = json!([10, 99, 30]);
        let changes = diff_values(&old, &new);
        assert_eq!(
            changes,
            vec![Change::Splice {
                path: "".into(),
                index: 1,
                removed: vec![json!(20)],
                removed_count: 1,
                added: vec![json!(99)],
                added_count: 1,
            }]
        );
        assert_round_trip(old, new);
    }

    #[test]
    fn array_append_produces_splice_at_end() {
        let old = json!([1, 2]);
        let new = json!([1, 2, 3]);
        let changes = diff_values(&old, &new);
        assert_eq!(
            changes,
            vec![Change::Splice {
                path: "".into(),
                index: 2,
                removed: vec![],
                removed_count: 0,
                added: vec![json!(3)],
                added_count: 1,
            }]
        );
        assert_round_trip(old, new);
    }

    #[test]
    fn array_truncation_produces_splice() {
        let old = json!([1, 2, 3]);
        let new = json!([1]);
        let changes = diff_values(&old, &new);
        assert_round_trip(old, new);
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn multiple_object_keys_change_independently() {
        let old = json!({"a": 1, "b": 2, "c": 3});
        let new = json!({"a": 1, "b": 20, "d": 4});
        assert_round_trip(old, new);
    }

    #[test]
    fn nested_array_inside_object_round_trips() {
        let old = json!({"items": [1, 2, 3], "meta": {"count": 3}});
        let new = json!({"items": [1, 99, 3, 4], "meta": {"count": 4}});
        assert_round_trip(old, new);
    }

    #[test]
    fn type_change_at_same_path_is_update() {
        let old = json!({"a": [1, 2]});
        let new = json!({"a": "replaced"});
        let changes = diff_values(&old, &new);
        assert_eq!(
            changes,
            vec![Change::Update {
                path: "a".into(),
                old_value: json!([1, 2]),
                new_value: json!("replaced"),
            }]
        );
        assert_round_trip(old, new);
    }
}
