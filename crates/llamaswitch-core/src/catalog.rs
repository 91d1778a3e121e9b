//! YAML-backed model catalog.
//!
//! The config file has a single interesting section:
//!
//! ```yaml
//! models:
//!   qwen-7b:
//!     cmd: llama-server -m /models/qwen.gguf --port ${PORT} -c ${CTX}
//!     label: Qwen 7B
//! ```
//!
//! A missing or unparsable file never takes the service down: the error is
//! logged and the previous set of models (empty at startup) stays in place.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{error, info};

use crate::domain::ModelConfig;
use crate::ports::ModelCatalogPort;

/// Errors from loading the catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    models: Option<BTreeMap<String, ModelConfig>>,
}

type ModelMap = Arc<BTreeMap<String, ModelConfig>>;

/// Model catalog loaded from a YAML file.
pub struct ModelCatalog {
    path: Option<PathBuf>,
    models: RwLock<ModelMap>,
    last_mtime: Mutex<Option<SystemTime>>,
}

impl ModelCatalog {
    /// Load the catalog from `path`, logging (not returning) load errors.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let catalog = Self {
            path: Some(path.into()),
            models: RwLock::new(Arc::new(BTreeMap::new())),
            last_mtime: Mutex::new(None),
        };
        if let Err(e) = catalog.reload() {
            error!("{e}");
        }
        catalog
    }

    /// Build an in-memory catalog (no backing file).
    pub fn from_models(models: impl IntoIterator<Item = ModelConfig>) -> Self {
        let map = models
            .into_iter()
            .map(|m| (m.key.clone(), m))
            .collect::<BTreeMap<_, _>>();
        Self {
            path: None,
            models: RwLock::new(Arc::new(map)),
            last_mtime: Mutex::new(None),
        }
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Re-read the backing file. Returns the number of models loaded.
    ///
    /// On error the current models are kept.
    pub fn reload(&self) -> Result<usize, CatalogError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(self.models().len());
        };
        if !path.exists() {
            return Err(CatalogError::NotFound(path.to_path_buf()));
        }

        // Remember the mtime even if parsing fails, so a broken file is
        // reported once per edit rather than on every poll.
        let mtime = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        *self.last_mtime.lock().unwrap_or_else(|e| e.into_inner()) = mtime;
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let models = parse_models(&content).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let count = models.len();
        *self.models.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(models);
        info!(count, path = %path.display(), "Loaded models");
        Ok(count)
    }

    /// True when the backing file's mtime is newer than the last load.
    pub fn changed_on_disk(&self) -> bool {
        let Some(path) = self.path.as_deref() else {
            return false;
        };
        let Ok(current) = std::fs::metadata(path).and_then(|m| m.modified()) else {
            return false;
        };
        let last = *self.last_mtime.lock().unwrap_or_else(|e| e.into_inner());
        last.is_none_or(|last| current > last)
    }
}

impl ModelCatalogPort for ModelCatalog {
    fn get(&self, key: &str) -> Option<ModelConfig> {
        self.models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn models(&self) -> ModelMap {
        Arc::clone(&self.models.read().unwrap_or_else(|e| e.into_inner()))
    }
}

fn parse_models(content: &str) -> Result<BTreeMap<String, ModelConfig>, serde_yaml::Error> {
    // An empty document deserializes as unit, not as an empty map.
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let file: ConfigFile = serde_yaml::from_str(content)?;
    let mut models = file.models.unwrap_or_default();
    for (key, model) in &mut models {
        model.key.clone_from(key);
    }
    Ok(models)
}
