//! Loosely-typed "extra fields" attached to agent events.
//!
//! Agent runtimes hang arbitrary payloads off their events. Rather than
//! reflecting over them, every payload must arrive as one of the shapes
//! below; the envelope normalizer in `cw-core` flattens them to JSON.

use serde::Deserialize;

/// A single extra-field value.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtraValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// An enumerated value with its member name and raw value.
    Enum { name: String, value: String },
    List(Vec<ExtraValue>),
    Map(ExtraFields),
    /// A structured object; only its public, non-callable fields survive
    /// normalization.
    Object(ExtraFields),
    /// A function or method reference. Dropped from objects, stringified
    /// elsewhere.
    Callable(String),
}

impl ExtraValue {
    pub fn enumeration(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Enum {
            name: name.into(),
            value: value.into(),
        }
    }

    /// String view of a scalar: `Str` verbatim, `Enum` by value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Enum { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Truthiness for flags such as `is_end`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::Str(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<serde_json::Value> for ExtraValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::Str(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Map(ExtraFields::from(map)),
        }
    }
}

impl From<&str> for ExtraValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ExtraValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for ExtraValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ExtraValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for ExtraValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<crate::AttachmentType> for ExtraValue {
    fn from(t: crate::AttachmentType) -> Self {
        let s = t.as_str().to_string();
        Self::Enum {
            name: s.clone(),
            value: s,
        }
    }
}

/// Ordered string-keyed collection of extra values.
///
/// Insertion order is kept so normalized details read the way the agent
/// wrote them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "serde_json::Map<String, serde_json::Value>")]
pub struct ExtraFields(Vec<(String, ExtraValue)>);

impl ExtraFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ExtraValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ExtraValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ExtraValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ExtraValue::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ExtraValue::as_bool)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtraValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for ExtraFields {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(
            map.into_iter()
                .map(|(k, v)| (k, ExtraValue::from(v)))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<ExtraValue>> FromIterator<(K, V)> for ExtraFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}
