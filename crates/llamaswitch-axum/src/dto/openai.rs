//! `/v1/models` DTOs.
//!
//! The list is returned in two shapes at once: the OpenAI `data` array, and
//! an Ollama-style `models` array that some chat frontends read instead.

use llamaswitch_core::ModelConfig;
use serde::Serialize;

/// Fixed creation timestamp; the catalog does not track one.
const CREATED: i64 = 1_677_619_200;

#[derive(Debug, Clone, Serialize)]
pub struct ModelList {
    pub object: &'static str,
    pub data: Vec<OpenAiModel>,
    pub models: Vec<OllamaModel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiModel {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub owned_by: &'static str,
    pub meta: ModelMeta,
}

/// llama-server style model metadata.
///
/// The catalog only knows commands, so these are placeholder values for
/// clients that refuse a model entry without them.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelMeta {
    pub vocab_type: u32,
    pub n_vocab: u64,
    pub n_ctx_train: u64,
    pub n_embd: u64,
    pub n_params: u64,
    pub size: u64,
}

impl Default for ModelMeta {
    fn default() -> Self {
        Self {
            vocab_type: 1,
            n_vocab: 32_000,
            n_ctx_train: 4096,
            n_embd: 4096,
            n_params: 7_000_000_000,
            size: 4_000_000_000,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OllamaModel {
    pub name: String,
    pub model: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub modified_at: String,
    pub size: String,
    pub digest: String,
    pub tags: Vec<String>,
    pub capabilities: Vec<&'static str>,
    pub details: ModelDetails,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelDetails {
    pub parent_model: String,
    pub format: &'static str,
    pub family: String,
    pub families: Vec<String>,
    pub parameter_size: String,
    pub quantization_level: String,
}

impl ModelList {
    pub fn from_models<'a>(models: impl IntoIterator<Item = &'a ModelConfig>) -> Self {
        let (data, models) = models
            .into_iter()
            .map(|m| (OpenAiModel::from(m), OllamaModel::from(m)))
            .unzip();
        Self {
            object: "list",
            data,
            models,
        }
    }
}

impl From<&ModelConfig> for OpenAiModel {
    fn from(model: &ModelConfig) -> Self {
        Self {
            id: model.key.clone(),
            object: "model",
            created: CREATED,
            owned_by: "llamacpp",
            meta: ModelMeta::default(),
        }
    }
}

impl From<&ModelConfig> for OllamaModel {
    fn from(model: &ModelConfig) -> Self {
        Self {
            name: model.key.clone(),
            model: model.key.clone(),
            kind: "model",
            modified_at: String::new(),
            size: String::new(),
            digest: String::new(),
            tags: Vec::new(),
            capabilities: model.capabilities(),
            details: ModelDetails {
                format: "gguf",
                ..ModelDetails::default()
            },
        }
    }
}
