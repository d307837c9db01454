//! Keyed UI state shared between the store and its subscribers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A plain mapping from string keys to JSON values.
///
/// Equality is structural: two states holding the same keys and values are
/// equal regardless of the order the keys were inserted in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(Map<String, Value>);

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for partial updates.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Shallow merge: every key of `partial` replaces the key in `self`.
    /// Nested objects are replaced, not merged.
    pub fn merged(&self, partial: &State) -> State {
        let mut next = self.0.clone();
        for (key, value) in &partial.0 {
            next.insert(key.clone(), value.clone());
        }
        State(next)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for State {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

impl TryFrom<Value> for State {
    type Error = Value;

    /// Only JSON objects are states; anything else is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for State {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
