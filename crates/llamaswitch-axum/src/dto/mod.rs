//! Data Transfer Objects (DTOs) for HTTP API contract.
//!
//! These types define the JSON shapes the dashboard and OpenAI clients rely
//! on, decoupled from the controller's own types.

pub mod control;
pub mod openai;

pub use control::{
    ConfigResponse, StartRequest, StartResponse, StatsDto, StatusMessage, StatusResponse,
};
pub use openai::{ModelDetails, ModelList, ModelMeta, OllamaModel, OpenAiModel};
