//! `{ moduleId: { key: value, ... }, ... }` documents.
//!
//! The same shape carries configuration (each entry has a `module-type`) and
//! per-tick data (each entry is the module's new variable map).

use serde_json::{Map, Value};

use crate::error::DocumentError;

/// Variable name to current value.
pub type VarMap = Map<String, Value>;

/// Configuration key to value for one module.
pub type ConfigMap = Map<String, Value>;

/// Reserved key naming the concrete module type.
pub const MODULE_TYPE_KEY: &str = "module-type";

/// A parsed document, entries in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, Map<String, Value>)>,
    malformed: Vec<String>,
}

impl Document {
    /// Parse document text.
    ///
    /// Entries whose value is not an object are not fatal: they are listed in
    /// [`Document::malformed`] so the caller can skip them individually.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let root: Value = serde_json::from_str(text)?;
        let Value::Object(root) = root else {
            return Err(DocumentError::NotAnObject {
                found: kind_of(&root),
            });
        };

        let mut doc = Self::default();
        for (id, value) in root {
            match value {
                Value::Object(map) => doc.entries.push((id, map)),
                _ => doc.malformed.push(id),
            }
        }
        Ok(doc)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Map<String, Value>> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, map)| map)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    /// Ids whose entry was not an object.
    pub fn malformed(&self) -> &[String] {
        &self.malformed
    }

    pub fn into_entries(self) -> Vec<(String, Map<String, Value>)> {
        self.entries
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
