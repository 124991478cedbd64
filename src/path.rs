//! Path Addressing
//!
//! Encodes a nested position inside a [`serde_json::Value`] as a dotted
//! string and provides `get`/`set`/`delete` over that position.

use serde_json::{Map, Value};
use std::fmt;

/// One step of a [`Path`]: either a map key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => write!(f, "{k}"),
            Segment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// A dot-delimited path into a structured value, e.g. `"a.b.3.c"`.
///
/// Numeric-looking segments are interpreted as sequence indices only when
/// the position they address is (or will become) an array; otherwise they
/// are treated as ordinary string keys. The empty path addresses the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Self::root();
        }
        let segments = s
            .split('.')
            .map(|raw| match raw.parse::<usize>() {
                Ok(n) if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) => {
                    Segment::Index(n)
                }
                _ => Segment::Key(raw.to_string()),
            })
            .collect();
        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Read the value at this path, if present.
    pub fn get<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        let mut cur = root;
        for seg in &self.segments {
            cur = match (seg, cur) {
                (Segment::Key(k), Value::Object(map)) => map.get(k)?,
                (Segment::Index(i), Value::Array(arr)) => arr.get(*i)?,
                _ => return None,
            };
        }
        Some(cur)
    }

    /// Write `value` at this path, creating intermediate objects/arrays as
    /// needed. The final segment may be a numeric index to insert into a
    /// sequence (growing it with `Value::Null` as needed).
    pub fn set(&self, root: &mut Value, value: Value) {
        if self.segments.is_empty() {
            *root = value;
            return;
        }
        let mut cur = root;
        let last = self.segments.len() - 1;
        for seg in &self.segments[..last] {
            cur = descend_or_create(cur, seg);
        }
        match &self.segments[last] {
            Segment::Key(k) => {
                if !cur.is_object() {
                    *cur = Value::Object(Map::new());
                }
                cur.as_object_mut().unwrap().insert(k.clone(), value);
            }
            Segment::Index(i) => {
                if !cur.is_array() {
                    *cur = Value::Array(Vec::new());
                }
                let arr = cur.as_array_mut().unwrap();
                if *i >= arr.len() {
                    arr.resize(*i + 1, Value::Null);
                }
                arr[*i] = value;
            }
        }
    }

    /// Remove the position addressed by this path, tolerating a missing
    /// intermediate path (silent no-op, per the codec's edge policy).
    pub fn delete(&self, root: &mut Value) {
        if self.segments.is_empty() {
            *root = Value::Null;
            return;
        }
        let last = self.segments.len() - 1;
        let mut cur = root;
        for seg in &self.segments[..last] {
            cur = match descend(cur, seg) {
                Some(v) => v,
                None => return,
            };
        }
        match &self.segments[last] {
            Segment::Key(k) => {
                if let Value::Object(map) = cur {
                    map.remove(k);
                }
            }
            Segment::Index(i) => {
                if let Value::Array(arr) = cur {
                    if *i < arr.len() {
                        arr.remove(*i);
                    }
                }
            }
        }
    }

    /// Obtain (or lazily create) the sequence at this path, for splice
    /// operations. Non-sequence values at the path are treated as if the
    /// sequence were empty and replaced (the codec's tolerant splice rule).
    pub fn get_or_create_array<'v>(&self, root: &'v mut Value) -> &'v mut Vec<Value> {
        if self.segments.is_empty() {
            if !root.is_array() {
                *root = Value::Array(Vec::new());
            }
            return root.as_array_mut().unwrap();
        }
        let mut cur = root;
        let last = self.segments.len() - 1;
        for seg in &self.segments[..last] {
            cur = descend_or_create(cur, seg);
        }
        let slot = match &self.segments[last] {
            Segment::Key(k) => {
                if !cur.is_object() {
                    *cur = Value::Object(Map::new());
                }
                cur.as_object_mut()
                    .unwrap()
                    .entry(k.clone())
                    .or_insert(Value::Null)
            }
            Segment::Index(i) => {
                if !cur.is_array() {
                    *cur = Value::Array(Vec::new());
                }
                let arr = cur.as_array_mut().unwrap();
                if *i >= arr.len() {
                    arr.resize(*i + 1, Value::Null);
                }
                &mut arr[*i]
            }
        };
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        slot.as_array_mut().unwrap()
    }
}

fn descend<'v>(cur: &'v mut Value, seg: &Segment) -> Option<&'v mut Value> {
    match (seg, cur) {
        (Segment::Key(k), Value::Object(map)) => map.get_mut(k),
        (Segment::Index(i), Value::Array(arr)) => arr.get_mut(*i),
        _ => None,
    }
}

fn descend_or_create<'v>(cur: &'v mut Value, seg: &Segment) -> &'v mut Value {
    match seg {
        Segment::Key(k) => {
            if !cur.is_object() {
                *cur = Value::Object(Map::new());
            }
            cur.as_object_mut()
                .unwrap()
                .entry(k.clone())
                .or_insert(Value::Null)
        }
        Segment::Index(i) => {
            if !cur.is_array() {
                *cur = Value::Array(Vec::new());
            }
            let arr = cur.as_array_mut().unwrap();
            if *i >= arr.len() {
                arr.resize(*i + 1, Value::Null);
            }
            &mut arr[*i]
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}
