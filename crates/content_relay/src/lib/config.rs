use std::{net::SocketAddr, time::Duration};

use anyhow::ensure;

use crate::{
    llm::{OpenAIClient, SamplingParams},
    prompt::DEFAULT_MAX_CONTENT_LENGTH,
    yt::YoutubeCaptions,
};

/// Settings of the `serve` command. Every flag falls back to its
/// environment variable.
#[derive(Debug, Clone, clap::Args)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind_addr: SocketAddr,

    /// OpenAI-compatible API key
    #[arg(long = "openai-key", env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Base URL of the completion API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = OpenAIClient::DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Completion model
    #[arg(long, env = "LLM_MODEL", default_value = OpenAIClient::DEFAULT_MODEL)]
    pub llm_model: String,

    /// Source text is truncated past this many characters
    #[arg(long, env = "MAX_CONTENT_LENGTH", default_value_t = DEFAULT_MAX_CONTENT_LENGTH)]
    pub max_content_length: usize,

    /// Timeout for page and caption fetches, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    #[arg(long, env = "DEFAULT_TEMPERATURE", default_value_t = 0.7)]
    pub default_temperature: f32,

    #[arg(long, env = "DEFAULT_MAX_TOKENS", default_value_t = 2048)]
    pub default_max_tokens: u32,

    #[arg(long, env = "DEFAULT_TOP_P", default_value_t = 1.0)]
    pub default_top_p: f32,

    /// Upper bound accepted for a caller supplied `max_tokens`
    #[arg(long, env = "MAX_TOKENS_LIMIT", default_value_t = 4096)]
    pub max_tokens_limit: u32,

    /// Preferred caption language
    #[arg(long, env = "CAPTION_LANGUAGE", default_value = YoutubeCaptions::DEFAULT_LANGUAGE)]
    pub caption_language: String,

    /// Request bodies above this size are rejected
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = 1024 * 1024)]
    pub max_body_bytes: usize,

    /// Postgres URL for notes; an in-memory store is used when unset
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Token verification endpoint; the notes API is disabled when unset
    #[arg(long, env = "AUTH_VERIFY_URL")]
    pub auth_verify_url: Option<String>,
}

/// Limits and defaults applied by the AI endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaySettings {
    pub max_content_length: usize,
    pub sampling: SamplingParams,
    pub max_tokens_limit: u32,
}

impl Default for RelaySettings {
    fn default() -> Self {
        RelaySettings {
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            sampling: SamplingParams::default(),
            max_tokens_limit: 4096,
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            !self.openai_api_key.trim().is_empty(),
            "OPENAI_API_KEY must not be empty"
        );
        ensure!(self.max_content_length > 0, "MAX_CONTENT_LENGTH must be positive");
        ensure!(self.fetch_timeout_secs > 0, "FETCH_TIMEOUT_SECS must be positive");
        ensure!(
            (0.0..=2.0).contains(&self.default_temperature),
            "DEFAULT_TEMPERATURE must be between 0 and 2"
        );
        ensure!(
            self.default_top_p > 0.0 && self.default_top_p <= 1.0,
            "DEFAULT_TOP_P must be in (0, 1]"
        );
        ensure!(self.max_tokens_limit > 0, "MAX_TOKENS_LIMIT must be positive");
        ensure!(
            (1..=self.max_tokens_limit).contains(&self.default_max_tokens),
            "DEFAULT_MAX_TOKENS must be between 1 and MAX_TOKENS_LIMIT ({})",
            self.max_tokens_limit
        );
        ensure!(self.max_body_bytes > 0, "MAX_BODY_BYTES must be positive");
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            max_content_length: self.max_content_length,
            sampling: SamplingParams {
                temperature: self.default_temperature,
                max_tokens: self.default_max_tokens,
                top_p: self.default_top_p,
            },
            max_tokens_limit: self.max_tokens_limit,
        }
    }
}
