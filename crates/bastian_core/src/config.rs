//! Engine configuration
//!
//! Settings are plain serde structs so they can be read from a json file (see the `run-js`
//! binary) or built in code. Every field has a default, a config file only needs to mention
//! what it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::Result;
use crate::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub v8: V8Config,
    pub quickjs: QuickJsConfig,
}

/// Heap limits for the per-thread V8 isolate. They are applied when the isolate is created,
/// which happens on the first run on a thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct V8Config {
    pub initial_heap_bytes: usize,
    pub max_heap_bytes: Option<usize>,
}

/// Limits for the QuickJS runtime created for each realm.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickJsConfig {
    pub memory_limit: Option<usize>,
    pub max_stack_size: Option<usize>,
    pub gc_threshold: Option<usize>,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;

        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_document() {
        let config = EngineConfig::from_json_str(
            r#"{
                "v8": { "max_heap_bytes": 67108864 },
                "quickjs": { "memory_limit": 1048576 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.v8.initial_heap_bytes, 0);
        assert_eq!(config.v8.max_heap_bytes, Some(64 * 1024 * 1024));
        assert_eq!(config.quickjs.memory_limit, Some(1024 * 1024));
        assert_eq!(config.quickjs.max_stack_size, None);
    }

    #[test]
    fn malformed_document() {
        let err = EngineConfig::from_json_str("{ \"v8\": 12 }").unwrap_err();
        assert!(err.to_string().starts_with("config error:"));
    }

    #[test]
    fn missing_file() {
        let err = EngineConfig::from_file("/nonexistent/bastian.json").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
