use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One timestamped event carrying named numeric fields.
///
/// `timestamp` and `duration` are milliseconds. A tick with no fields is the empty
/// sentinel: processors return it when they have nothing to emit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: i64,
    #[serde(default)]
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, f64>,
}

impl Tick {
    pub fn new(timestamp: i64, duration: i64) -> Self {
        Self {
            timestamp,
            duration,
            id: None,
            fields: BTreeMap::new(),
        }
    }

    /// The empty sentinel.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    #[inline]
    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    /// Like [`Tick::field`], but an absent field is a `MissingField` error.
    #[inline]
    pub fn get_field(&self, name: &str) -> Result<f64> {
        self.field(name).ok_or_else(|| EngineError::missing_field(name))
    }

    /// Inserts or overwrites a field, returning the previous value.
    pub fn set_field(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.fields.insert(name.into(), value)
    }

    pub fn remove_field(&mut self, name: &str) -> Option<f64> {
        self.fields.remove(name)
    }

    /// Fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Overlays every field of `other` onto `self`; `other` wins on collision.
    pub fn merge_from(&mut self, other: &Tick) {
        for (k, v) in &other.fields {
            self.fields.insert(k.clone(), *v);
        }
    }

    /// End of the bucket this tick covers.
    #[inline]
    pub fn end(&self) -> i64 {
        self.timestamp + self.duration
    }
}
