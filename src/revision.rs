//! Revision Hasher
//!
//! Every mutation to a [`crate::replicant::Replicant`] is labelled with an
//! opaque, content-derived [`RevisionLabel`] rather than a bare sequence
//! number, so peers can detect divergence (two replicas computed the same
//! sequence number from different histories) instead of only detecting
//! staleness.

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;

/// Positions in [`RevisionHistory`] below this index are never evicted:
/// position 0 is the creation revision, position 1 is the first mutation,
/// and both are referenced directly by the divergent-parent check in §4.5.
const EXEMPT_PREFIX_LEN: usize = 2;

/// Default cap on retained revision labels (§3, §9).
pub const DEFAULT_HISTORY_CAP: usize = 100;

/// An opaque content-derived revision identifier. Equality, not ordering,
/// is the only thing callers may rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionLabel(#[serde(with = "hex_bytes")] [u8; 32]);

impl RevisionLabel {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for RevisionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Derive the revision label for sequence number `seq` over `value`.
///
/// Hashes the sequence number followed by the value's canonical JSON
/// encoding. `serde_json::Map` is `BTreeMap`-backed by default, so object
/// keys serialize in sorted order without a separate canonicalization pass
/// — two semantically identical values always hash identically regardless
/// of field insertion order.
pub fn revision_label(seq: u64, value: &Value) -> RevisionLabel {
    let mut hasher = Hasher::new();
    hasher.update(&seq.to_le_bytes());
    hasher.update(
        serde_json::to_vec(value)
            .expect("serde_json::Value serialization is infallible")
            .as_slice(),
    );
    RevisionLabel(*hasher.finalize().as_bytes())
}

/// The bounded ordered log of revision labels a [`crate::replicant::Replicant`]
/// has produced, oldest first. Used to answer "have I already seen this
/// parent revision" without retaining every historical value snapshot.
#[derive(Debug, Clone, Default)]
pub struct RevisionHistory {
    labels: VecDeque<RevisionLabel>,
    cap: usize,
}

impl RevisionHistory {
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_HISTORY_CAP)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            labels: VecDeque::new(),
            cap: cap.max(EXEMPT_PREFIX_LEN),
        }
    }

    /// Append a newly produced label, trimming the tail (the oldest entry)
    /// if the history is over its cap. Storage is oldest-first, so the tail
    /// is the front of the deque; since `cap` is always at least
    /// [`EXEMPT_PREFIX_LEN`], the two most recent entries — "position 0"
    /// (current) and "position 1" (parent) in the wire's most-recent-first
    /// ordering — are never among those trimmed.
    pub fn push(&mut self, label: RevisionLabel) {
        self.labels.push_back(label);
        while self.labels.len() > self.cap {
            self.labels.pop_front();
        }
    }

    pub fn contains(&self, label: &RevisionLabel) -> bool {
        self.labels.contains(label)
    }

    pub fn latest(&self) -> Option<&RevisionLabel> {
        self.labels.back()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The label at `idx` positions back from the most recent, i.e. the
    /// wire's most-recent-first indexing: `nth_most_recent(0)` is current,
    /// `nth_most_recent(1)` is parent.
    pub fn nth_most_recent(&self, idx: usize) -> Option<RevisionLabel> {
        let len = self.labels.len();
        if idx >= len {
            return None;
        }
        self.labels.get(len - 1 - idx).copied()
    }

    /// Render as the wire's most-recent-first `Vec`.
    pub fn to_vec_most_recent_first(&self) -> Vec<RevisionLabel> {
        self.labels.iter().rev().copied().collect()
    }

    /// Rebuild from a most-recent-first `Vec` (e.g. adopting a peer's
    /// `revisionHistory` wholesale during synchronize/resync).
    pub fn from_vec_most_recent_first(labels: Vec<RevisionLabel>, cap: usize) -> Self {
        let mut history = Self::with_cap(cap);
        history.labels.extend(labels.into_iter().rev());
        history
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("revision label must be 32 bytes"))
    }
}
