//! Change Codec — forward application and inverse reversal of a change-list
//! against a value snapshot. Pure, non-mutating, tolerant of malformed or
//! stale changes (per §4.1's edge policy).

use crate::change::Change;
use crate::path::Path;
use serde_json::Value;

/// Apply `changes` in order to a deep copy of `value`, returning the result.
/// `value` is never mutated.
pub fn apply_changes(value: &Value, changes: &[Change]) -> Value {
    let mut out = value.clone();
    for change in changes {
        apply_one(&mut out, change);
    }
    out
}

/// Apply `changes` in *reverse* order, undoing each one, to a deep copy of
/// `value`. `value` is never mutated.
pub fn reverse_changes(value: &Value, changes: &[Change]) -> Value {
    let mut out = value.clone();
    for change in changes.iter().rev() {
        reverse_one(&mut out, change);
    }
    out
}

fn apply_one(root: &mut Value, change: &Change) {
    match change {
        Change::Add { path, new_value } | Change::Update { path, new_value, .. } => {
            Path::parse(path).set(root, new_value.clone());
        }
        Change::Splice {
            path,
            index,
            removed_count,
            added,
            ..
        } => splice(root, path, *index, *removed_count, added.clone()),
        Change::Delete { path, .. } => {
            Path::parse(path).delete(root);
        }
    }
}

fn reverse_one(root: &mut Value, change: &Change) {
    match change {
        Change::Add { path, .. } => {
            Path::parse(path).delete(root);
        }
        Change::Update { path, old_value, .. } => {
            Path::parse(path).set(root, old_value.clone());
        }
        Change::Splice {
            path,
            index,
            removed,
            added_count,
            ..
        } => splice(root, path, *index, *added_count, removed.clone()),
        Change::Delete { path, old_value } => {
            Path::parse(path).set(root, old_value.clone());
        }
    }
}

/// Splice `inserted` into the sequence at `path`, replacing `remove_count`
/// elements starting at `index`. A path that does not resolve to a
/// sequence is treated as an empty one (§4.1 edge policy) so that replay
/// of out-of-order creation signals degrades gracefully instead of
/// panicking or raising.
fn splice(root: &mut Value, path: &str, index: usize, remove_count: usize, inserted: Vec<Value>) {
    let arr = Path::parse(path).get_or_create_array(root);
    let index = index.min(arr.len());
    let end = (index + remove_count).min(arr.len());
    arr.splice(index..end, inserted);
}
