//! Core configuration for Planrun.

mod config;

pub use config::{AiConfig, Config, ExecutionConfig, GeneralConfig, OllamaConfig};
