//! LLM provider clients.
//!
//! Each submodule implements [`flowmill_core::llm::LlmProvider`] for one
//! vendor API. API keys are wrapped in [`secrecy::SecretString`] and are
//! only exposed while building request headers; none of the clients
//! derive `Debug`.

pub mod anthropic;
pub mod google;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;
