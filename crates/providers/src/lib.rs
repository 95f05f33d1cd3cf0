//! LLM client implementations for OpenTwin.
//!
//! All clients implement the `opentwin_core::LlmClient` trait.
//! The factory selects the correct one from configuration.

pub mod anthropic;
pub mod factory;
mod http;
pub mod openai_compat;

pub use anthropic::AnthropicClient;
pub use factory::{build_from_config, default_base_url};
pub use openai_compat::OpenAiCompatClient;
