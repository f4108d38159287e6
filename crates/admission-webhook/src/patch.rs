//! Structured construction of RFC 6902 JSON Patch documents.
//!
//! Paths are assembled from unescaped tokens, `jsonptr` takes care of
//! escaping `~` and `/`; values are serde values, never interpolated text.

use json_patch::{jsonptr::PointerBuf, AddOperation, Patch, PatchOperation};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default)]
pub struct PatchBuilder {
    operations: Vec<PatchOperation>,
}

impl PatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an `add` operation targeting the location identified by `tokens`.
    pub fn add<'t>(mut self, tokens: impl IntoIterator<Item = &'t str>, value: Value) -> Self {
        self.operations.push(PatchOperation::Add(AddOperation {
            path: PointerBuf::from_tokens(tokens),
            value,
        }));
        self
    }

    /// Set `key` to `value` inside of the map found at `parent` in `document`.
    ///
    /// An `add` requires the parent of its target to exist. When part of
    /// `parent` is missing from `document`, the operation targets the first
    /// missing location and carries the whole nested structure instead.
    pub fn add_map_entry(self, document: &Value, parent: &[&str], key: &str, value: &str) -> Self {
        let mut current = document;
        for (depth, token) in parent.iter().enumerate() {
            match current.get(*token) {
                Some(next) if next.is_object() => current = next,
                _ => {
                    let nested = parent[depth + 1..]
                        .iter()
                        .rev()
                        .fold(single_entry(key, Value::from(value)), |inner, token| {
                            single_entry(token, inner)
                        });
                    return self.add(parent[..=depth].iter().copied(), nested);
                }
            }
        }

        self.add(
            parent.iter().copied().chain(std::iter::once(key)),
            Value::from(value),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn build(self) -> Patch {
        Patch(self.operations)
    }
}

fn single_entry(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_owned(), value);
    Value::Object(map)
}
