//! HTTP request handlers for the Axum web server.
//!
//! Handlers are thin wrappers that delegate to the `SessionController`.

pub mod config;
pub mod control;
pub mod logs;
pub mod openai;
