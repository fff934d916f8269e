use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{ChartError, ChartResult};

/// Flat option map for one chart instance.
///
/// Keys keep insertion order so serialized configs diff cleanly. Unknown
/// options are stored and round-tripped but never interpreted by the core.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartConfig {
    options: IndexMap<String, Value>,
}

impl ChartConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.options.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.options.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        serde_json::from_str(input)
            .map_err(|e| ChartError::InvalidData(format!("failed to parse chart config json: {e}")))
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ChartError::InvalidData(format!("failed to serialize chart config: {e}")))
    }

    #[must_use]
    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        match self.options.get(key) {
            None | Some(Value::Null) => default,
            Some(value) => match value.as_f64().filter(|v| v.is_finite()) {
                Some(number) => number,
                None => {
                    warn!(option = key, %value, "expected a finite number, using default");
                    default
                }
            },
        }
    }

    #[must_use]
    pub fn u32_or(&self, key: &str, default: u32) -> u32 {
        let number = self.f64_or(key, f64::from(default));
        if number < 0.0 || number > f64::from(u32::MAX) {
            warn!(option = key, number, "value out of u32 range, using default");
            return default;
        }
        number.round() as u32
    }

    #[must_use]
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.options.get(key) {
            None | Some(Value::Null) => default,
            Some(Value::Bool(flag)) => *flag,
            Some(value) => {
                warn!(option = key, %value, "expected a boolean, using default");
                default
            }
        }
    }

    #[must_use]
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.options.get(key) {
            None | Some(Value::Null) => default,
            Some(Value::String(text)) => text,
            Some(value) => {
                warn!(option = key, %value, "expected a string, using default");
                default
            }
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ChartConfig {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            options: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Shallow, key-wise merge of option maps.
///
/// Nested values are replaced wholesale, never deep-merged.
pub struct ConfigMerger;

impl ConfigMerger {
    #[must_use]
    pub fn merge(defaults: &ChartConfig, overrides: &ChartConfig) -> ChartConfig {
        let mut merged = defaults.clone();
        for (key, value) in &overrides.options {
            merged.options.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Same rule for raw data: object keys merge, anything else replaces.
    #[must_use]
    pub fn merge_value(base: &Value, overrides: &Value) -> Value {
        match (base, overrides) {
            (Value::Object(base), Value::Object(overrides)) => {
                let mut merged = base.clone();
                for (key, value) in overrides {
                    merged.insert(key.clone(), value.clone());
                }
                Value::Object(merged)
            }
            (_, replacement) => replacement.clone(),
        }
    }
}
