//! Replicant entity — a single named value, its revision chain, and the
//! echo-suppression discipline that keeps server/client-driven writes from
//! re-entering the local edit path.

use crate::diff::diff_values;
use crate::revision::{revision_label, RevisionHistory, RevisionLabel, DEFAULT_HISTORY_CAP};
use crate::{change::Change, codec::reverse_changes};
use serde_json::Value;

/// RAII echo guard. Acquiring one marks the replicant as mid-authoritative-
/// write; it is cleared on every exit path (normal return, early `?`, panic
/// unwind) because the clearing happens in `Drop`, not in caller-written
/// cleanup code.
pub struct SuppressGuard<'a> {
    flag: &'a mut bool,
}

impl<'a> SuppressGuard<'a> {
    fn new(flag: &'a mut bool) -> Self {
        *flag = true;
        Self { flag }
    }
}

impl Drop for SuppressGuard<'_> {
    fn drop(&mut self) {
        *self.flag = false;
    }
}

/// A named replicated value.
///
/// Created lazily (on first reference by name) with an empty value,
/// sequence number 0, and empty history; lives for the process's lifetime.
#[derive(Debug, Clone)]
pub struct Replicant {
    name: String,
    value: Value,
    sequence_number: u64,
    history: RevisionHistory,
    suppress_observer: bool,
}

impl Replicant {
    /// Construct a freshly-registered replicant: `Value::Null`, sequence 0,
    /// empty history — matches the wire reply to a first `replicantGet`.
    /// `cap` bounds the revision history per §3/§9 (see
    /// [`crate::revision::RevisionHistory::with_cap`]).
    pub fn new(name: impl Into<String>, cap: usize) -> Self {
        Self {
            name: name.into(),
            value: Value::Null,
            sequence_number: 0,
            history: RevisionHistory::with_cap(cap),
            suppress_observer: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn history(&self) -> &RevisionHistory {
        &self.history
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppress_observer
    }

    /// The current revision, always derived, never stored.
    pub fn revision(&self) -> RevisionLabel {
        revision_label(self.sequence_number, &self.value)
    }

    /// Apply a locally-driven edit (client UI code, or a server-originated
    /// write arriving for the first time). Replaces the Deep Observer: the
    /// closure mutates a clone of the current value, and the before/after
    /// pair is diffed into the change-list the caller pushes out over the
    /// protocol. Does not touch sequence number or history — the caller
    /// decides, per §4.6/§4.7, how those advance.
    pub fn edit<F: FnOnce(&mut Value)>(&self, f: F) -> (Value, Vec<Change>) {
        let mut new_value = self.value.clone();
        f(&mut new_value);
        let changes = diff_values(&self.value, &new_value);
        (new_value, changes)
    }

    /// Accept an authoritative whole-value replacement (the `replicantSet`
    /// heavy path, or a client's initial `synchronize()`), advancing
    /// sequence number and history to match. Runs under suppression so
    /// that, were an observer attached, it would not re-emit this as a
    /// local edit.
    pub fn accept_set(&mut self, new_value: Value, sequence_number: u64, history: RevisionHistory) {
        let _guard = SuppressGuard::new(&mut self.suppress_observer);
        self.value = new_value;
        self.sequence_number = sequence_number;
        self.history = history;
    }

    /// Accept an authoritative incremental change-list (the `replicantChanged`
    /// accept path), advancing sequence number by one and prepending the
    /// freshly computed revision label to history.
    pub fn accept_changes(&mut self, changes: &[Change]) -> RevisionLabel {
        let _guard = SuppressGuard::new(&mut self.suppress_observer);
        self.value = crate::codec::apply_changes(&self.value, changes);
        self.sequence_number += 1;
        let label = revision_label(self.sequence_number, &self.value);
        self.history.push(label);
        label
    }

    /// Accept a whole-value replacement whose provenance is a client-claimed
    /// history with its own unconfirmed head already dropped (the server's
    /// `replicantSet` accept path, §4.6): rebuild history from
    /// `base_history`, then advance one step exactly as `accept_changes`
    /// does — a fresh revision label computed from the value already
    /// installed, prepended to the rebuilt history.
    pub fn accept_set_and_advance(
        &mut self,
        new_value: Value,
        base_history: Vec<RevisionLabel>,
        cap: usize,
    ) -> RevisionLabel {
        let _guard = SuppressGuard::new(&mut self.suppress_observer);
        self.value = new_value;
        self.history = RevisionHistory::from_vec_most_recent_first(base_history, cap);
        self.sequence_number = self.history.len() as u64 + 1;
        let label = revision_label(self.sequence_number, &self.value);
        self.history.push(label);
        label
    }

    /// Construct a replicant directly from known state, e.g. when a client
    /// adopts a server snapshot it did not derive locally. Does not go
    /// through suppression since there is no prior state being overwritten
    /// in place.
    pub fn from_snapshot(
        name: impl Into<String>,
        value: Value,
        sequence_number: u64,
        history_labels: Vec<RevisionLabel>,
        cap: usize,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            sequence_number,
            history: RevisionHistory::from_vec_most_recent_first(history_labels, cap),
            suppress_observer: false,
        }
    }

    /// The pre-edit value implied by reversing `changes` against the
    /// current value; used by `pushChanges` callers that need the old
    /// value to report alongside the new one.
    pub fn value_before(&self, changes: &[Change]) -> Value {
        reverse_changes(&self.value, changes)
    }

    /// Advance past a locally-originated write before it has been
    /// acknowledged (client-side `pushChanges` step 1, §4.7): the revision
    /// label is computed against the already-updated value and prepended
    /// to history *before* the message is sent, not after the ack arrives.
    /// Not suppressed — this is the local edit path itself, not a
    /// server-driven write being mirrored back in.
    pub fn advance_local(&mut self, new_value: Value) -> RevisionLabel {
        self.value = new_value;
        self.sequence_number += 1;
        let label = revision_label(self.sequence_number, &self.value);
        self.history.push(label);
        label
    }

    /// Accept a `replicantChanged` broadcast whose parent matches what this
    /// replicant currently holds (client-side inbound handler, §4.7):
    /// apply forward, then adopt the server's own history wholesale rather
    /// than re-deriving it, since the server is authoritative.
    pub fn accept_changed_from_server(
        &mut self,
        changes: &[Change],
        server_history: Vec<RevisionLabel>,
        history_cap: usize,
    ) -> RevisionLabel {
        let _guard = SuppressGuard::new(&mut self.suppress_observer);
        self.value = crate::codec::apply_changes(&self.value, changes);
        self.history = RevisionHistory::from_vec_most_recent_first(server_history, history_cap);
        self.sequence_number = self.history.len() as u64;
        self.history
            .nth_most_recent(0)
            .unwrap_or_else(|| revision_label(self.sequence_number, &self.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_replicant_starts_empty() {
        let r = Replicant::new("x", DEFAULT_HISTORY_CAP);
        assert_eq!(r.value(), &Value::Null);
        assert_eq!(r.sequence_number(), 0);
        assert!(r.history().is_empty());
    }

    #[test]
    fn revision_is_derived_from_sequence_and_value() {
        let r = Replicant::new("x", DEFAULT_HISTORY_CAP);
        assert_eq!(r.revision(), revision_label(0, &Value::Null));
    }

    #[test]
    fn edit_produces_change_list_without_mutating_self() {
        let r = Replicant::new("x", DEFAULT_HISTORY_CAP);
        let (new_value, changes) = r.edit(|v| *v = json!({"a": 1}));
        assert_eq!(new_value, json!({"a": 1}));
        assert_eq!(changes, vec![Change::Add { path: "".into(), new_value: json!({"a": 1}) }]);
        assert_eq!(r.value(), &Value::Null, "edit must not mutate the replicant");
    }

    #[test]
    fn accept_set_advances_sequence_and_history() {
        let mut r = Replicant::new("x", DEFAULT_HISTORY_CAP);
        let mut history = RevisionHistory::new();
        let label = revision_label(1, &json!({"a": 1}));
        history.push(label);
        r.accept_set(json!({"a": 1}), 1, history);
        assert_eq!(r.value(), &json!({"a": 1}));
        assert_eq!(r.sequence_number(), 1);
        assert_eq!(r.history().latest(), Some(&label));
        assert!(!r.is_suppressed(), "guard must clear on return");
    }

    #[test]
    fn accept_changes_applies_and_advances_one_step() {
        let mut r = Replicant::new("x", DEFAULT_HISTORY_CAP);
        r.accept_set(json!({"a": 1}), 1, {
            let mut h = RevisionHistory::new();
            h.push(revision_label(1, &json!({"a": 1})));
            h
        });
        let changes = vec![Change::Update {
            path: "a".into(),
            old_value: json!(1),
            new_value: json!(2),
        }];
        let label = r.accept_changes(&changes);
        assert_eq!(r.value(), &json!({"a": 2}));
        assert_eq!(r.sequence_number(), 2);
        assert_eq!(label, r.revision());
        assert_eq!(r.history().latest(), Some(&label));
    }

    #[test]
    fn value_before_reverses_changes_against_current_value() {
        let mut r = Replicant::new("x", DEFAULT_HISTORY_CAP);
        r.accept_set(json!({"a": 2}), 1, RevisionHistory::new());
        let changes = vec![Change::Update {
            path: "a".into(),
            old_value: json!(1),
            new_value: json!(2),
        }];
        assert_eq!(r.value_before(&changes), json!({"a": 1}));
    }

    #[test]
    fn accept_set_and_advance_rebuilds_history_then_bumps_once_more() {
        let mut r = Replicant::new("x", DEFAULT_HISTORY_CAP);
        let base = vec![revision_label(5, &json!("whatever"))];
        let label = r.accept_set_and_advance(json!({"a": 1}), base.clone(), DEFAULT_HISTORY_CAP);
        assert_eq!(r.value(), &json!({"a": 1}));
        // sequence_number = len(base) + 1
        assert_eq!(r.sequence_number(), 2);
        assert_eq!(label, r.revision());
        assert_eq!(r.history().len(), base.len() + 1);
        assert_eq!(r.history().nth_most_recent(0), Some(label));
        assert_eq!(r.history().nth_most_recent(1), Some(base[0]));
    }

    #[test]
    fn from_snapshot_builds_history_in_wire_order() {
        let l1 = revision_label(1, &json!(1));
        let l0 = revision_label(0, &json!(0));
        let r = Replicant::from_snapshot("x", json!(1), 1, vec![l1, l0], DEFAULT_HISTORY_CAP);
        assert_eq!(r.history().nth_most_recent(0), Some(l1));
        assert_eq!(r.history().nth_most_recent(1), Some(l0));
    }

    #[test]
    fn advance_local_bumps_sequence_and_prepends_label_before_any_ack() {
        let mut r = Replicant::new("x", DEFAULT_HISTORY_CAP);
        let label = r.advance_local(json!({"a": 1}));
        assert_eq!(r.value(), &json!({"a": 1}));
        assert_eq!(r.sequence_number(), 1);
        assert_eq!(label, r.revision());
        assert_eq!(r.history().nth_most_recent(0), Some(label));
    }

    #[test]
    fn accept_changed_from_server_applies_forward_and_adopts_server_history() {
        let mut r = Replicant::new("x", DEFAULT_HISTORY_CAP);
        r.accept_set(json!({"a": 1}), 1, {
            let mut h = RevisionHistory::new();
            h.push(revision_label(1, &json!({"a": 1})));
            h
        });
        let changes = vec![Change::Update {
            path: "a".into(),
            old_value: json!(1),
            new_value: json!(2),
        }];
        let server_history = vec![
            revision_label(2, &json!({"a": 2})),
            revision_label(1, &json!({"a": 1})),
        ];
        let label = r.accept_changed_from_server(&changes, server_history.clone(), DEFAULT_HISTORY_CAP);
        assert_eq!(r.value(), &json!({"a": 2}));
        assert_eq!(r.sequence_number(), 2);
        assert_eq!(label, server_history[0]);
        assert_eq!(r.history().to_vec_most_recent_first(), server_history);
        assert!(!r.is_suppressed());
    }

    #[test]
    fn suppress_guard_clears_on_early_return_via_question_mark() {
        fn fallible(r: &mut Replicant) -> Result<(), ()> {
            let _guard = SuppressGuard::new(&mut r.suppress_observer);
            Err(())?;
            Ok(())
        }
        let mut r = Replicant::new("x", DEFAULT_HISTORY_CAP);
        let _ = fallible(&mut r);
        assert!(!r.is_suppressed());
    }
}
