use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Maximum size in bytes of a key or string value carried into the index.
pub const INDEX_VALUE_MAX_SIZE: usize = 128;

/// A schemaless, versioned record.
///
/// The `uid` is empty until the object is first persisted. Once assigned,
/// `uid`, `author` and `created` never change; the client facade enforces
/// this regardless of what a caller passes back in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub uid: String,
    pub author: String,
    pub modifier: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub data: BTreeMap<String, Value>,
}

impl Object {
    /// A fresh, not yet persisted object holding `data`.
    pub fn new(data: BTreeMap<String, Value>) -> Self {
        Self {
            uid: String::new(),
            author: String::new(),
            modifier: String::new(),
            created: DateTime::<Utc>::UNIX_EPOCH,
            modified: DateTime::<Utc>::UNIX_EPOCH,
            data,
        }
    }

    /// An object handle addressing an already persisted uid.
    pub fn with_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }

    /// Builder-style helper for setting a single data field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Returns `true` once a uid has been assigned.
    pub fn is_persisted(&self) -> bool {
        !self.uid.is_empty()
    }

    /// Derive the size-bounded index projection.
    ///
    /// Keys longer than [`INDEX_VALUE_MAX_SIZE`] are dropped, longer string
    /// values are cut at the nearest character boundary below the limit and
    /// every number is widened to a float.
    pub fn index(&self) -> IndexObject {
        let data = self
            .data
            .iter()
            .filter(|(key, _)| key.len() <= INDEX_VALUE_MAX_SIZE)
            .map(|(key, value)| (key.clone(), index_value(value)))
            .collect();
        IndexObject {
            uid: self.uid.clone(),
            author: self.author.clone(),
            modifier: self.modifier.clone(),
            created: self.created,
            modified: self.modified,
            data,
        }
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

fn index_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(truncate(s, INDEX_VALUE_MAX_SIZE).to_string()),
        Value::Int(i) => Value::Float(*i as f64),
        other => other.clone(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// The index projection of an [`Object`].
///
/// This is what queries and permission predicates are evaluated against, so
/// large payloads never enter the matching path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexObject {
    pub uid: String,
    pub author: String,
    #[serde(default)]
    pub modifier: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub data: BTreeMap<String, Value>,
}

impl IndexObject {
    /// Resolve a field name for query evaluation.
    ///
    /// `uid`, `created` and `modified` (with or without a leading underscore)
    /// and `_author`/`_modifier` resolve to metadata, timestamps as unix
    /// seconds. Any other name resolves against `data`.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "uid" | "_uid" => Some(Value::String(self.uid.clone())),
            "created" | "_created" => Some(Value::Int(self.created.timestamp())),
            "modified" | "_modified" => Some(Value::Int(self.modified.timestamp())),
            "_author" => Some(Value::String(self.author.clone())),
            "_modifier" => Some(Value::String(self.modifier.clone())),
            _ => self.data.get(name).cloned(),
        }
    }
}
