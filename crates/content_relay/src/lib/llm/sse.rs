//! Decoding of OpenAI-style `text/event-stream` completion bodies.

use std::collections::VecDeque;

use futures::{stream, Stream, StreamExt};
use serde::Deserialize;

use crate::llm::{completion::CompletionStream, openai::OpenAIError};

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    message: String,
}

/// Incremental line decoder. Bytes may be split anywhere, including inside a
/// multi-byte character; only complete lines are decoded.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Stops decoding; anything fed afterwards is ignored.
    pub fn close(&mut self) {
        self.done = true;
        self.buffer.clear();
    }

    /// Feeds raw bytes, returning the text deltas of every completed line.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<String, OpenAIError>> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.drain(..=pos).collect::<Vec<u8>>();
            out.extend(self.decode_line(&line));
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        out
    }

    /// Decodes a trailing unterminated line, if any, and closes the decoder.
    pub fn finish(&mut self) -> Vec<Result<String, OpenAIError>> {
        let rest = std::mem::take(&mut self.buffer);
        let out = self.decode_line(&rest).into_iter().collect();
        self.close();
        out
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<Result<String, OpenAIError>> {
        if self.done {
            return None;
        }
        let line = String::from_utf8_lossy(line);
        let data = line
            .trim_end_matches(['\r', '\n'])
            .strip_prefix("data:")?
            .trim_start();

        if data == "[DONE]" {
            self.done = true;
            return None;
        }

        match serde_json::from_str::<ChunkPayload>(data) {
            Ok(ChunkPayload {
                error: Some(error), ..
            }) => {
                self.done = true;
                Some(Err(OpenAIError::Stream(error.message)))
            }
            Ok(chunk) => chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .filter(|content| !content.is_empty())
                .map(Ok),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decode completion chunk");
                Some(Err(OpenAIError::Decode(e.to_string())))
            }
        }
    }
}

/// Turns a raw response body into a stream of text deltas.
///
/// The stream ends at `[DONE]`, at the end of the body, or right after the
/// first transport/upstream error.
pub fn chunk_stream<S, B>(bytes: S) -> CompletionStream
where
    S: Stream<Item = reqwest::Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = (
        bytes.boxed(),
        SseDecoder::default(),
        VecDeque::<Result<String, OpenAIError>>::new(),
    );

    stream::unfold(state, |(mut bytes, mut decoder, mut pending)| async move {
        loop {
            if let Some(item) = pending.pop_front() {
                return Some((item, (bytes, decoder, pending)));
            }
            if decoder.is_done() {
                return None;
            }
            match bytes.next().await {
                Some(Ok(chunk)) => pending.extend(decoder.feed(chunk.as_ref())),
                Some(Err(e)) => {
                    tracing::error!(error = %e, "Completion stream interrupted");
                    decoder.close();
                    pending.push_back(Err(OpenAIError::Request(e)));
                }
                None => pending.extend(decoder.finish()),
            }
        }
    })
    .map(|item| item.map_err(crate::Error::from))
    .boxed()
}
