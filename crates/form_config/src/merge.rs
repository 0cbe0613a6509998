//! Deep merge of a base document with overlay documents.
//!
//! Rules, per key:
//! - scalars in the overlay replace scalars in the base
//! - maps merge recursively, missing keys are created
//! - sequences are merged element by element: maps carrying the identity
//!   field (`"name"` by default) merge into the base element with the same
//!   identity at its original position, or are appended; every other element
//!   is appended unless an equal element is already present
//!
//! A `null` overlay is a no-op.

use serde_json::{Map, Value};

pub const DEFAULT_IDENTITY_KEY: &str = "name";

/// Keyed-list aware overlay merger.
#[derive(Debug, Clone)]
pub struct OverlayMerge {
    identity_key: String,
}

impl Default for OverlayMerge {
    fn default() -> Self {
        Self::new(DEFAULT_IDENTITY_KEY)
    }
}

impl OverlayMerge {
    pub fn new(identity_key: impl Into<String>) -> Self {
        Self {
            identity_key: identity_key.into(),
        }
    }

    pub fn identity_key(&self) -> &str {
        &self.identity_key
    }

    /// Merge `overlay` into `base` in place.
    pub fn merge(&self, base: &mut Value, overlay: &Value) {
        match (base, overlay) {
            (_, Value::Null) => {}
            (Value::Object(this), Value::Object(other)) => self.merge_maps(this, other),
            (Value::Array(this), Value::Array(other)) => self.merge_sequences(this, other),
            (this, other) => *this = other.clone(),
        }
    }

    /// Apply every overlay to `base`, in order.
    pub fn merge_all<'a>(&self, mut base: Value, overlays: impl IntoIterator<Item = &'a Value>) -> Value {
        for overlay in overlays {
            self.merge(&mut base, overlay);
        }
        base
    }

    fn merge_maps(&self, this: &mut Map<String, Value>, other: &Map<String, Value>) {
        for (k, v) in other {
            if let Some(existing) = this.get_mut(k) {
                self.merge(existing, v);
            } else if !v.is_null() {
                this.insert(k.clone(), v.clone());
            }
        }
    }

    fn merge_sequences(&self, this: &mut Vec<Value>, other: &[Value]) {
        for item in other {
            match self.identity_of(item) {
                Some(id) => {
                    let position = this
                        .iter()
                        .position(|existing| self.identity_of(existing) == Some(id));
                    match position {
                        Some(ix) => self.merge(&mut this[ix], item),
                        None => this.push(item.clone()),
                    }
                }
                None => {
                    if !this.contains(item) {
                        this.push(item.clone());
                    }
                }
            }
        }
    }

    fn identity_of<'v>(&self, value: &'v Value) -> Option<&'v str> {
        value.as_object()?.get(&self.identity_key)?.as_str()
    }
}

/// Merge `overlays` into `base` with the default identity key.
pub fn merge_documents<'a>(base: Value, overlays: impl IntoIterator<Item = &'a Value>) -> Value {
    OverlayMerge::default().merge_all(base, overlays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn scalar_overlay_replaces_base() {
        let merged = merge_documents(json!({"a": 1, "b": "x"}), [&json!({"a": 2})]);
        assert_eq!(merged, json!({"a": 2, "b": "x"}));
    }

    #[test]
    fn nested_maps_merge_and_create_missing_keys() {
        let base = json!({"outer": {"keep": true, "inner": {"x": 1}}});
        let overlay = json!({"outer": {"inner": {"y": 2}, "new": "n"}});
        let merged = merge_documents(base, [&overlay]);
        assert_eq!(
            merged,
            json!({"outer": {"keep": true, "inner": {"x": 1, "y": 2}, "new": "n"}})
        );
    }

    #[test]
    fn scalar_sequences_union_in_order() {
        let merged = merge_documents(
            json!({"tabs": ["Domain", "Physics"]}),
            [&json!({"tabs": ["Physics", "Output", "Domain", "Mesh"]})],
        );
        assert_eq!(merged, json!({"tabs": ["Domain", "Physics", "Output", "Mesh"]}));
    }

    #[test]
    fn keyed_sequence_merges_matching_element() {
        let merged = merge_documents(
            json!({"frames": [{"name": "f1", "row": 1}]}),
            [&json!({"frames": [{"name": "f1", "title": "T"}]})],
        );
        assert_eq!(merged, json!({"frames": [{"name": "f1", "row": 1, "title": "T"}]}));
    }

    #[test]
    fn keyed_sequence_appends_new_identity() {
        let merged = merge_documents(
            json!({"frames": [{"name": "f1", "row": 1}]}),
            [&json!({"frames": [{"name": "f2"}]})],
        );
        assert_eq!(merged, json!({"frames": [{"name": "f1", "row": 1}, {"name": "f2"}]}));
    }

    #[test]
    fn keyed_merge_keeps_original_position() {
        let base = json!({"w": [{"name": "a"}, {"name": "b", "v": 1}, {"name": "c"}]});
        let merged = merge_documents(base, [&json!({"w": [{"name": "b", "v": 2}]})]);
        assert_eq!(
            merged,
            json!({"w": [{"name": "a"}, {"name": "b", "v": 2}, {"name": "c"}]})
        );
    }

    #[test]
    fn overlays_apply_in_caller_order() {
        let merged = merge_documents(
            json!({"v": 0}),
            [&json!({"v": 1}), &json!({"v": 2})],
        );
        assert_eq!(merged, json!({"v": 2}));
    }

    #[test]
    fn null_and_empty_overlays_are_noops() {
        let base = json!({"frames": [{"name": "f1"}], "x": 1});
        let merged = merge_documents(base.clone(), [&Value::Null, &json!({})]);
        assert_eq!(merged, base);
    }

    #[test]
    fn custom_identity_key() {
        let merger = OverlayMerge::new("id");
        let mut base = json!([{"id": "k", "a": 1}]);
        merger.merge(&mut base, &json!([{"id": "k", "b": 2}, {"name": "k"}]));
        assert_eq!(base, json!([{"id": "k", "a": 1, "b": 2}, {"name": "k"}]));
    }
}
