//! Model domain types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A model entry from the catalog.
///
/// Only `cmd` is interpreted; every other user field is carried along
/// verbatim so the dashboard can display whatever the config author wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Catalog key. Filled in from the map key when the catalog is loaded.
    #[serde(skip)]
    pub key: String,
    /// Command template, e.g. `llama-server -m foo.gguf --port ${PORT}`.
    #[serde(default)]
    pub cmd: String,
    /// Any other fields present in the config entry.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ModelConfig {
    /// Create a model entry with just a key and a command template.
    pub fn new(key: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cmd: cmd.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Capabilities advertised on the OpenAI-compatible model list.
    ///
    /// A command that loads a multimodal projector (`mmproj`) is reported
    /// as multimodal.
    pub fn capabilities(&self) -> Vec<&'static str> {
        let mut caps = vec!["completion", "chat"];
        if self.cmd.contains("mmproj") {
            caps.push("multimodal");
        }
        caps
    }
}
