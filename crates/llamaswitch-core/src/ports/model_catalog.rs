//! Model catalog port.
//!
//! The controller resolves model keys through this trait so that where the
//! models come from (YAML file, tests, something else) stays outside of it.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::ModelConfig;

/// Read access to the configured models.
pub trait ModelCatalogPort: Send + Sync {
    /// Look up a model by key.
    fn get(&self, key: &str) -> Option<ModelConfig>;

    /// All configured models, keyed by model key.
    fn models(&self) -> Arc<BTreeMap<String, ModelConfig>>;
}
