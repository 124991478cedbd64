//! Change record — the atomic edit unit applied and reversed by the codec.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single tagged edit against a structured value.
///
/// Exactly one of four shapes, matching §3 of the protocol. Paths are
/// dotted strings (see [`crate::path::Path`]); sequence operations carry
/// enough information (`removed`, `added_count`, ...) to be reversed
/// without re-reading the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Change {
    Add {
        path: String,
        new_value: Value,
    },
    Update {
        path: String,
        old_value: Value,
        new_value: Value,
    },
    Splice {
        path: String,
        index: usize,
        removed: Vec<Value>,
        removed_count: usize,
        added: Vec<Value>,
        added_count: usize,
    },
    Delete {
        path: String,
        old_value: Value,
    },
}

impl Change {
    pub fn path(&self) -> &str {
        match self {
            Change::Add { path, .. }
            | Change::Update { path, .. }
            | Change::Splice { path, .. }
            | Change::Delete { path, .. } => path,
        }
    }
}
