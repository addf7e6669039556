//! # Streaming Response Relay
//!
//! Drives one incremental completion and forwards its chunks to the caller as
//! [`StreamEvent`]s, in upstream order. A spawned driver task owns the
//! upstream stream and feeds a bounded channel; the caller holds the
//! receiving [`RelayStream`]. Dropping that stream (the caller went away)
//! cancels the driver, which drops the upstream response and so aborts the
//! HTTP call.

use std::{
    collections::VecDeque,
    pin::Pin,
    task::{Context, Poll},
};

use chrono::Utc;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::{
    llm::completion::{CompletionRequest, CompletionService, CompletionStream},
    types::{RelayMetadata, StreamEvent},
    Error,
};

const CHANNEL_CAPACITY: usize = 64;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

pub struct Relay;

impl Relay {
    /// Opens the upstream completion and starts relaying it.
    ///
    /// Failing to open is returned here, before anything has been sent to the
    /// caller. Failures after that arrive as a terminal [`StreamEvent::Error`].
    #[tracing::instrument(skip_all, fields(model = %metadata.model))]
    pub async fn open<L: CompletionService>(
        llm: &L,
        request: CompletionRequest,
        metadata: RelayMetadata,
    ) -> Result<RelayStream, Error> {
        let upstream = llm
            .complete_stream(request)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to open completion stream"))?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let token = CancellationToken::new();
        tokio::spawn(drive(upstream, tx, token.clone(), metadata));

        Ok(RelayStream {
            preamble: VecDeque::new(),
            rx,
            _cancel_on_drop: token.drop_guard(),
        })
    }
}

async fn drive(
    mut upstream: CompletionStream,
    tx: mpsc::Sender<StreamEvent>,
    token: CancellationToken,
    mut metadata: RelayMetadata,
) {
    let mut accumulated = String::new();
    let mut chunks = 0usize;

    loop {
        let next = tokio::select! {
            _ = token.cancelled() => {
                tracing::info!(chunks, "Caller disconnected, aborting completion");
                return;
            }
            next = upstream.next() => next,
        };

        match next {
            Some(Ok(text)) if text.is_empty() => continue,
            Some(Ok(text)) => {
                chunks += 1;
                accumulated.push_str(&text);
                if tx.send(StreamEvent::Delta { text }).await.is_err() {
                    tracing::info!(chunks, "Receiver dropped, aborting completion");
                    return;
                }
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, chunks, "Completion failed mid-stream");
                let _ = tx.send(StreamEvent::from(&e)).await;
                return;
            }
            None => break,
        }
    }

    metadata.completed_at = Some(Utc::now());
    let full_text = strip_think_blocks(&accumulated);
    tracing::info!(chunks, chars = full_text.len(), "Completion finished");

    let _ = tx
        .send(StreamEvent::Done {
            full_text,
            metadata,
        })
        .await;
}

/// Caller side of a relay. Yields any preamble events, then the relayed
/// deltas, then exactly one terminal event.
pub struct RelayStream {
    preamble: VecDeque<StreamEvent>,
    rx: mpsc::Receiver<StreamEvent>,
    _cancel_on_drop: DropGuard,
}

impl RelayStream {
    /// Queues status events ahead of the first delta.
    pub fn with_preamble(mut self, events: impl IntoIterator<Item = StreamEvent>) -> Self {
        self.preamble.extend(events);
        self
    }
}

impl Stream for RelayStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(event) = self.preamble.pop_front() {
            return Poll::Ready(Some(event));
        }
        self.rx.poll_recv(cx)
    }
}

/// Removes every `<think>…</think>` block and trims the result.
///
/// Tags match case-insensitively and blocks may span lines. Each closing tag
/// removes everything from the outermost still-open tag up to itself, so a
/// nested block goes with its parent and an unclosed opener before a closed
/// pair is swallowed too. An opener with no closer after it, and stray
/// closers, are left in place.
pub fn strip_think_blocks(text: &str) -> String {
    // ASCII lowering keeps byte offsets aligned with `text`
    let lower = text.to_ascii_lowercase();

    let mut open = Vec::new();
    let mut blocks: Vec<(usize, usize)> = Vec::new();
    let mut pos = 0;

    while pos < lower.len() {
        let rest = &lower[pos..];
        if rest.starts_with(THINK_OPEN) {
            open.push(pos);
            pos += THINK_OPEN.len();
        } else if rest.starts_with(THINK_CLOSE) {
            let end = pos + THINK_CLOSE.len();
            if let Some(inner) = open.pop() {
                let start = open.first().copied().unwrap_or(inner);
                blocks.retain(|(s, _)| *s < start);
                blocks.push((start, end));
            }
            pos = end;
        } else {
            pos += rest.chars().next().map_or(1, char::len_utf8);
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end) in blocks {
        out.push_str(&text[last..start]);
        last = end;
    }
    out.push_str(&text[last..]);

    out.trim().to_string()
}
