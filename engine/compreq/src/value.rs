use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

/// Metadata for an uploaded file part. The payload itself stays with the
/// transport; this core only routes the handle into the data tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    pub content_type: Option<String>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, size: u64, content_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            size,
            content_type,
        }
    }
}

impl Display for UploadedFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<file {} ({} bytes)>", self.name, self.size)
    }
}

/// String-keyed map that remembers insertion order.
///
/// Keys are unique: inserting an existing key replaces its value in place.
/// Equality ignores entry order, matching how two JSON objects with the same
/// members compare.
#[derive(Clone, Debug, Default)]
pub struct Mapping {
    entries: IndexMap<String, Value>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace. Returns the previous value for `key`, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Return the value for `key`, inserting the result of `default` first if
    /// the key is absent.
    pub fn entry_or_insert_with(
        &mut self,
        key: &str,
        default: impl FnOnce() -> Value,
    ) -> &mut Value {
        match self.entries.get_index_of(key) {
            Some(index) => &mut self.entries[index],
            None => self.entries.entry(key.to_string()).or_insert_with(default),
        }
    }

    /// Remove `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|theirs| theirs == value))
    }
}

impl Eq for Mapping {}

impl<K: Into<String>> FromIterator<(K, Value)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

impl IntoIterator for Mapping {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// The decoded request data model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    /// Only produced for integers that do not fit in `i64`.
    UInt(u64),
    Float(OrderedFloat<f64>),
    String(String),
    Sequence(Vec<Value>),
    Mapping(Mapping),
    File(UploadedFile),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::File(_) => "file",
        }
    }

    pub fn empty_mapping() -> Value {
        Value::Mapping(Mapping::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Falsy in the sense clients use: null, false, zero, and empty
    /// strings or containers.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(v) => *v == 0,
            Value::UInt(v) => *v == 0,
            Value::Float(v) => v.0 == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Sequence(items) => items.is_empty(),
            Value::Mapping(entries) => entries.is_empty(),
            Value::File(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Value::File(file) => Some(file),
            _ => None,
        }
    }

    /// Look up a member when this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping().and_then(|entries| entries.get(key))
    }

    /// Render scalars the way they appear in JSON text. Strings come back
    /// unquoted; containers and files yield `None`.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Int(v) => Some(v.to_string()),
            Value::UInt(v) => Some(v.to_string()),
            Value::Float(v) => Some(crate::checksum::format_float(v.0)),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Sequence(_) | Value::Mapping(_) | Value::File(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Mapping> for Value {
    fn from(value: Mapping) -> Self {
        Value::Mapping(value)
    }
}

impl From<UploadedFile> for Value {
    fn from(value: UploadedFile) -> Self {
        Value::File(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_equality_ignores_order() {
        let left: Mapping = [("a", Value::Int(1)), ("b", Value::Int(2))]
            .into_iter()
            .collect();
        let right: Mapping = [("b", Value::Int(2)), ("a", Value::Int(1))]
            .into_iter()
            .collect();
        assert_eq!(left, right);
        assert_eq!(left.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut mapping = Mapping::new();
        mapping.insert("a", Value::Int(1));
        mapping.insert("b", Value::Int(2));
        let previous = mapping.insert("a", Value::Int(3));
        assert_eq!(previous, Some(Value::Int(1)));
        assert_eq!(mapping.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(mapping.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let mut mapping: Mapping = [("a", Value::Int(1)), ("b", Value::Int(2)), ("c", Value::Int(3))]
            .into_iter()
            .collect();
        assert_eq!(mapping.remove("a"), Some(Value::Int(1)));
        assert_eq!(mapping.keys().collect::<Vec<_>>(), vec!["b", "c"]);
        *mapping.entry_or_insert_with("d", || Value::Null) = Value::Int(4);
        *mapping.entry_or_insert_with("b", || Value::Null) = Value::Int(5);
        assert_eq!(mapping.keys().collect::<Vec<_>>(), vec!["b", "c", "d"]);
        assert_eq!(mapping.get("b"), Some(&Value::Int(5)));
    }

    #[test]
    fn falsy_values() {
        assert!(Value::Null.is_falsy());
        assert!(Value::empty_mapping().is_falsy());
        assert!(Value::String(String::new()).is_falsy());
        assert!(!Value::String("x".into()).is_falsy());
        assert!(!Value::File(UploadedFile::new("a.txt", 0, None)).is_falsy());
    }
}
