//! Wire Protocol
//!
//! The six message rows of the external-interfaces table, modeled as two
//! directional enums. Transports that serialize to bytes use `serde`/JSON;
//! the in-process channel transport passes these values directly.

use crate::change::Change;
use crate::revision::RevisionLabel;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages a client sends to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message", rename_all = "camelCase")]
pub enum ClientMessage {
    /// `replicantRegister(name)` — ack is `()`.
    ReplicantRegister { name: String },
    /// `replicantGet(name)` — ack is `(revisionHistory, value)`.
    ReplicantGet { name: String },
    /// `replicantSet(name, revisionHistory, value)` — ack is `success: bool`.
    ReplicantSet {
        name: String,
        revision_history: Vec<RevisionLabel>,
        value: Value,
    },
    /// `replicantChanged(name, revisionHistory, changes)` — ack is `success: bool`.
    ReplicantChanged {
        name: String,
        revision_history: Vec<RevisionLabel>,
        changes: Vec<Change>,
    },
}

/// Messages the server multicasts to a replicant's room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message", rename_all = "camelCase")]
pub enum ServerMessage {
    /// `replicantSet(name, revisionHistory, value)` — no ack.
    ReplicantSet {
        name: String,
        revision_history: Vec<RevisionLabel>,
        value: Value,
    },
    /// `replicantChanged(name, revisionHistory, changes)` — no ack.
    ReplicantChanged {
        name: String,
        revision_history: Vec<RevisionLabel>,
        changes: Vec<Change>,
    },
}

impl ServerMessage {
    pub fn name(&self) -> &str {
        match self {
            ServerMessage::ReplicantSet { name, .. } => name,
            ServerMessage::ReplicantChanged { name, .. } => name,
        }
    }

    pub fn revision_history(&self) -> &[RevisionLabel] {
        match self {
            ServerMessage::ReplicantSet { revision_history, .. } => revision_history,
            ServerMessage::ReplicantChanged { revision_history, .. } => revision_history,
        }
    }
}

/// Reply to `replicantGet`: the authoritative `(revisionHistory, value)`
/// pair. Also doubles as the tolerant-deserialize DTO mentioned in §9 — a
/// `revision` field may ride along on wire payloads produced by a peer that
/// round-trips its read-only `revision` property; it is accepted and
/// dropped rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicantSnapshot {
    pub revision_history: Vec<RevisionLabel>,
    pub value: Value,
    /// Accepted on deserialize, never written; see module docs.
    #[serde(default, skip_serializing)]
    pub revision: Option<RevisionLabel>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_register_round_trips_through_json() {
        let msg = ClientMessage::ReplicantRegister { name: "x".into() };
        let encoded = serde_json::to_string(&msg).unwrap();
        assert!(encoded.contains("\"replicantRegister\""));
        let _decoded: ClientMessage = serde_json::from_str(&encoded).unwrap();
    }

    #[test]
    fn server_message_accessors_cover_both_variants() {
        let set = ServerMessage::ReplicantSet {
            name: "x".into(),
            revision_history: vec![],
            value: json!(1),
        };
        assert_eq!(set.name(), "x");

        let changed = ServerMessage::ReplicantChanged {
            name: "y".into(),
            revision_history: vec![],
            changes: vec![],
        };
        assert_eq!(changed.name(), "y");
    }

    #[test]
    fn snapshot_tolerates_stray_revision_field_on_deserialize() {
        let hex64 = "a".repeat(64);
        let json = format!(r#"{{"revisionHistory":[],"value":null,"revision":"{hex64}"}}"#);
        let snapshot: ReplicantSnapshot = serde_json::from_str(&json).unwrap();
        assert!(snapshot.revision.is_some());

        let json_absent = r#"{"revisionHistory":[],"value":null}"#;
        let snapshot: ReplicantSnapshot = serde_json::from_str(json_absent).unwrap();
        assert_eq!(snapshot.revision, None);
    }

    #[test]
    fn snapshot_does_not_serialize_revision_field() {
        let snapshot = ReplicantSnapshot {
            revision_history: vec![],
            value: json!(null),
            revision: None,
        };
        let encoded = serde_json::to_value(&snapshot).unwrap();
        assert!(encoded.get("revision").is_none());
    }
}
