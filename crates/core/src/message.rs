//! Keyed messages: the string-keyed containers exchanged with the remote
//! scheduler.
//!
//! A [`KeyedMessage`] carries job parameters plus, by convention, one entry
//! holding a transportable reference to a completion callback. Values are
//! heterogeneous ([`Value`]); transportable references arrive as
//! [`TransportObject`]s whose payload stays opaque until something that
//! understands the declared type reconstructs it.

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::endpoint::Handle;
use crate::parcel::Parcel;

/// One value inside a keyed message.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    /// Nested keyed message.
    Message(KeyedMessage),
    /// Transportable object with a declared type and an opaque payload.
    Object(TransportObject),
    /// Bare transportable reference, with no declared type.
    Handle(Handle),
}

impl Value {
    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Message(_) => "message",
            Value::Object(_) => "object",
            Value::Handle(_) => "handle",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&KeyedMessage> {
        match self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&TransportObject> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
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

impl From<KeyedMessage> for Value {
    fn from(value: KeyedMessage) -> Self {
        Value::Message(value)
    }
}

impl From<TransportObject> for Value {
    fn from(value: TransportObject) -> Self {
        Value::Object(value)
    }
}

impl From<Handle> for Value {
    fn from(value: Handle) -> Self {
        Value::Handle(value)
    }
}

/// A typed object that crossed the process boundary.
///
/// The payload is kept as written by the sender. Reconstructing it is the job
/// of whoever recognizes `type_name`; decoding a keyed message never looks
/// inside.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportObject {
    type_name: String,
    payload: Parcel,
}

impl TransportObject {
    pub fn new(type_name: impl Into<String>, payload: Parcel) -> Self {
        Self {
            type_name: type_name.into(),
            payload,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// A fresh reader over the payload, positioned at the start.
    pub fn open(&self) -> Parcel {
        Parcel::from_parts(
            self.payload.data().to_vec(),
            self.payload.objects().to_vec(),
        )
    }

    pub(crate) fn payload(&self) -> &Parcel {
        &self.payload
    }
}

/// Order-irrelevant mapping from string keys to [`Value`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyedMessage {
    entries: BTreeMap<String, Value>,
}

impl KeyedMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous value under `key` if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(Value::as_int)
    }

    pub fn get_message(&self, key: &str) -> Option<&KeyedMessage> {
        self.get(key).and_then(Value::as_message)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }
}

impl IntoIterator for KeyedMessage {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a KeyedMessage {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for KeyedMessage
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_and_returns_previous() {
        let mut m = KeyedMessage::new();
        assert!(m.insert("a", 1).is_none());
        assert_eq!(m.insert("a", "x"), Some(Value::Int(1)));
        assert_eq!(m.get_str("a"), Some("x"));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn typed_getters_reject_other_variants() {
        let m = KeyedMessage::new()
            .with("n", 3)
            .with("s", "three")
            .with("nested", KeyedMessage::new().with("k", true));

        assert_eq!(m.get_int("n"), Some(3));
        assert_eq!(m.get_int("s"), None);
        assert_eq!(m.get_str("n"), None);
        assert_eq!(m.get_message("nested").map(KeyedMessage::len), Some(1));
        assert!(m.get("missing").is_none());
    }

    #[test]
    fn remove_detaches_single_entry() {
        let mut m: KeyedMessage = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(m.remove("a"), Some(Value::Int(1)));
        assert!(!m.contains_key("a"));
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn transport_object_open_starts_at_payload_head() {
        let mut payload = Parcel::new();
        payload.write_i32(11);
        let object = TransportObject::new("demo.Type", payload);

        let mut first = object.open();
        assert_eq!(first.read_i32().unwrap(), 11);
        let mut second = object.open();
        assert_eq!(second.read_i32().unwrap(), 11);
        assert_eq!(object.type_name(), "demo.Type");
    }
}
