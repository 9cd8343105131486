//! Infrastructure implementations for Flowmill.
//!
//! Concrete adapters behind the ports `flowmill-core` defines: a
//! reqwest-backed HTTP dispatcher, LLM provider clients, an HTTP mail
//! sender, in-memory repositories, and the settings loader.

pub mod http;
pub mod llm;
pub mod mail;
pub mod memory;
pub mod settings;
