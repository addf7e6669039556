//! # Content Relay
//!
//! A thin HTTP backend for a mobile notes client. It extracts readable text
//! from web pages and YouTube caption tracks, builds summarization prompts,
//! relays incremental LLM completions to the caller as server-sent events and
//! proxies owner-scoped note and workspace storage.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod llm;
pub mod prompt;
pub mod relay;
pub mod server;
pub mod telemetry;
pub mod types;
pub mod yt;

pub use error::Error;
pub use llm::openai;
pub use server::{RelayServer, RelayServerBuilder};
