use std::future::Future;

use futures::stream::BoxStream;
use serde::Serialize;

use crate::Error;

/// Incremental text chunks of one completion, in arrival order.
pub type CompletionStream = BoxStream<'static, Result<String, Error>>;

pub trait CompletionService: Send + Sync + 'static {
    /// Model identifier reported in response metadata.
    fn model(&self) -> &str;

    /// Single-shot completion returning the whole assistant message.
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<String, Error>> + Send;

    /// Opens an incremental completion.
    ///
    /// Resolves once the upstream has accepted the request, so a failure to
    /// open surfaces here rather than as the first stream item.
    fn complete_stream(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<CompletionStream, Error>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        SamplingParams {
            temperature: 0.7,
            max_tokens: 2048,
            top_p: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub params: SamplingParams,
}
