use reqwest::Client;
use serde::Deserialize;

use crate::{
    llm::{
        completion::{CompletionRequest, CompletionService, CompletionStream},
        sse,
    },
    Error,
};

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenAIError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Stream error: {0}")]
    Stream(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("No content in completion response")]
    EmptyResponse,
}

impl From<OpenAIError> for Error {
    fn from(err: OpenAIError) -> Self {
        let status = match &err {
            OpenAIError::Request(e) => e.status().map(|s| s.as_u16()),
            OpenAIError::Api { status, .. } => Some(*status),
            _ => None,
        };
        Error::Upstream {
            status,
            message: err.to_string(),
        }
    }
}

impl OpenAIClient {
    pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.into(),
            model: Self::DEFAULT_MODEL.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn request_body(&self, request: &CompletionRequest, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.params.temperature,
            "max_tokens": request.params.max_tokens,
            "top_p": request.params.top_p,
            "stream": stream,
        })
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, OpenAIError> {
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request, stream))
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            tracing::error!(status, message, "Completion request rejected");
            return Err(OpenAIError::Api { status, message });
        }

        Ok(resp)
    }

    pub async fn send_completion_request(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, OpenAIError> {
        Ok(self.send(request, false).await?.json().await?)
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub id: Option<String>,
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: CompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: Option<String>,
}

impl CompletionService for OpenAIClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[tracing::instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<String, Error> {
        let response = self
            .send_completion_request(&request)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to complete request"))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(OpenAIError::EmptyResponse)?;

        Ok(content)
    }

    #[tracing::instrument(skip_all, fields(model = %self.model))]
    async fn complete_stream(&self, request: CompletionRequest) -> Result<CompletionStream, Error> {
        let resp = self.send(&request, true).await?;
        tracing::debug!("Completion stream opened");

        Ok(sse::chunk_stream(resp.bytes_stream()))
    }
}
