pub mod completion;
pub mod openai;
mod sse;

pub use completion::{
    ChatMessage, CompletionRequest, CompletionService, CompletionStream, Role, SamplingParams,
};
pub use openai::{OpenAIClient, OpenAIError};
