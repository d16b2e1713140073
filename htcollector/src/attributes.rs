//! Helpers over OTLP attribute lists.
//!
//! Attribute keys may carry an index suffix (`base[n]`) when the same logical
//! attribute occurs more than once, e.g. repeated headers. Rule lookups are
//! always done on the unindexed form.

use crate::proto::{any_value::Value, AnyValue, KeyValue};

/// Returns the key with any `[n]` index suffix removed.
pub fn unindexed_key(key: &str) -> &str {
    match key.split_once('[') {
        Some((base, _)) => base,
        None => key,
    }
}

/// Builds a string valued attribute.
pub fn string_attribute(key: impl Into<String>, value: impl Into<String>) -> KeyValue {
    KeyValue {
        key: key.into(),
        value: Some(AnyValue {
            value: Some(Value::StringValue(value.into())),
        }),
    }
}

/// Returns the string payload of a value, if it is a string.
pub fn as_str(value: &AnyValue) -> Option<&str> {
    match &value.value {
        Some(Value::StringValue(s)) => Some(s.as_str()),
        _ => None,
    }
}

/// Renders any value as text. Scalars use their natural representation,
/// bytes are hex encoded and arrays/maps are rendered as JSON.
pub fn to_text(value: &AnyValue) -> String {
    match &value.value {
        Some(Value::StringValue(s)) => s.clone(),
        Some(Value::BoolValue(b)) => b.to_string(),
        Some(Value::IntValue(i)) => i.to_string(),
        Some(Value::DoubleValue(d)) => d.to_string(),
        Some(Value::BytesValue(b)) => const_hex::encode(b),
        Some(Value::ArrayValue(_)) | Some(Value::KvlistValue(_)) => to_json(value).to_string(),
        None => String::new(),
    }
}

/// Converts a value into a JSON tree.
pub fn to_json(value: &AnyValue) -> serde_json::Value {
    match &value.value {
        Some(Value::StringValue(s)) => serde_json::Value::String(s.clone()),
        Some(Value::BoolValue(b)) => serde_json::Value::Bool(*b),
        Some(Value::IntValue(i)) => serde_json::Value::from(*i),
        Some(Value::DoubleValue(d)) => serde_json::Number::from_f64(*d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Value::BytesValue(b)) => serde_json::Value::String(const_hex::encode(b)),
        Some(Value::ArrayValue(array)) => {
            serde_json::Value::Array(array.values.iter().map(to_json).collect())
        }
        Some(Value::KvlistValue(list)) => serde_json::Value::Object(
            list.values
                .iter()
                .map(|kv| {
                    let value = kv.value.as_ref().map(to_json).unwrap_or_default();
                    (kv.key.clone(), value)
                })
                .collect(),
        ),
        None => serde_json::Value::Null,
    }
}

/// Returns the value of the first attribute with `key`.
pub fn find<'a>(attributes: &'a [KeyValue], key: &str) -> Option<&'a AnyValue> {
    attributes
        .iter()
        .find(|kv| kv.key == key)
        .and_then(|kv| kv.value.as_ref())
}

/// Lookup and update helpers for an attribute list.
///
/// OTLP attribute lists are plain vectors; keys are expected to be unique but
/// nothing enforces it, so lookups return the first occurrence.
pub trait AttributesExt {
    /// Returns the value of the first attribute with `key`.
    fn find(&self, key: &str) -> Option<&AnyValue>;

    /// Returns the string value of the first attribute with `key`.
    fn find_str(&self, key: &str) -> Option<&str> {
        self.find(key).and_then(as_str)
    }

    /// Whether an attribute with `key` exists.
    fn contains_key(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Replaces the value of an existing attribute or appends a new one.
    fn upsert(&mut self, attribute: KeyValue);

    /// Appends the attribute unless its key is already present. Returns
    /// whether the attribute was added.
    fn insert_if_absent(&mut self, attribute: KeyValue) -> bool;
}

impl AttributesExt for Vec<KeyValue> {
    fn find(&self, key: &str) -> Option<&AnyValue> {
        find(self, key)
    }

    fn upsert(&mut self, attribute: KeyValue) {
        match self.iter_mut().find(|kv| kv.key == attribute.key) {
            Some(existing) => existing.value = attribute.value,
            None => self.push(attribute),
        }
    }

    fn insert_if_absent(&mut self, attribute: KeyValue) -> bool {
        if self.iter().any(|kv| kv.key == attribute.key) {
            return false;
        }
        self.push(attribute);
        true
    }
}
