//! The governed state: a JSON document addressed by slash-separated paths.
//!
//! The core never interprets the document beyond path addressing; its shape
//! belongs to the system being governed. Digests are SHA-256 over the
//! canonical JSON serialization, so two states with equal digests are
//! byte-identical.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// The mutable document the kernel governs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GovernedState {
    root: Value,
}

impl GovernedState {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// An empty object root.
    pub fn empty() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// SHA-256 (hex) of the canonical JSON serialization.
    pub fn digest(&self) -> String {
        // serde_json keys are ordered, so equal documents serialize equally.
        let bytes = serde_json::to_vec(&self.root).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    /// The sub-tree at a slash-separated path, if present.
    pub fn subtree(&self, path: &str) -> Option<&Value> {
        let mut cursor = &self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            cursor = cursor.as_object()?.get(segment)?;
        }
        Some(cursor)
    }

    /// Replace the sub-tree at `path` with `value`, creating intermediate
    /// objects as needed. An empty path replaces the whole document.
    pub fn splice(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            self.root = value;
            return;
        }
        let mut cursor = &mut self.root;
        for segment in &segments[..segments.len() - 1] {
            if !cursor.is_object() {
                *cursor = Value::Object(Map::new());
            }
            let Value::Object(map) = cursor else { return };
            cursor = map.entry(segment.to_string()).or_insert(Value::Null);
        }
        if !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        if let Value::Object(map) = cursor {
            map.insert(segments[segments.len() - 1].to_string(), value);
        }
    }
}

impl Default for GovernedState {
    fn default() -> Self {
        Self::empty()
    }
}
