//! Serializable run and pipeline definitions.

use crate::error::{EngineError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Settings for a stream run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// Capacity of the bounded output channel.
    pub capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "stream capacity must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// A named pipeline, built stage by stage through a [`crate::Registry`].
///
/// ```json
/// {
///   "name": "trend",
///   "stream": { "capacity": 256 },
///   "stages": [
///     { "kind": "sma", "name": "sma20", "params": { "period": 20 } },
///     { "kind": "rsi", "params": { "period": 14, "output": "rsi" } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub name: String,
    #[serde(default)]
    pub stream: StreamConfig,
    pub stages: Vec<StageConfig>,
}

impl PipelineConfig {
    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: PipelineConfig = serde_json::from_str(s)?;
        cfg.stream.validate()?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    /// Registry key, e.g. `"sma"`.
    pub kind: String,
    /// Stage name; defaults to `kind`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl StageConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            params: Map::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn stage_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.kind)
    }

    /// Decodes `params` into a typed parameter struct.
    pub fn params<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.params.clone())).map_err(|e| {
            EngineError::InvalidConfig(format!("stage `{}`: {e}", self.stage_name()))
        })
    }
}
