use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use content_relay::{
    llm::{CompletionRequest, CompletionService, CompletionStream},
    Error,
};
use futures::{stream, StreamExt};

#[derive(Clone)]
pub struct MockCompletion {
    pub chunks: Vec<String>,
    pub calls: Arc<Mutex<Vec<CompletionRequest>>>,
    pub fail_with: Option<(u16, String)>,
    pub fail_mid_stream: Option<String>,
    /// When set, the stream never ends and flips the flag once dropped.
    pub endless: Option<Arc<AtomicBool>>,
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl MockCompletion {
    pub fn new(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
            fail_mid_stream: None,
            endless: None,
        }
    }

    /// Refuses to open, as an upstream answering with `status`.
    pub fn failing(status: u16, msg: &str) -> Self {
        Self {
            fail_with: Some((status, msg.to_string())),
            ..Self::new(&[])
        }
    }

    /// Yields `chunks`, then breaks off with `msg`.
    pub fn failing_mid_stream(chunks: &[&str], msg: &str) -> Self {
        Self {
            fail_mid_stream: Some(msg.to_string()),
            ..Self::new(chunks)
        }
    }

    /// Yields `chunks`, then keeps ticking until the consumer goes away.
    pub fn endless(chunks: &[&str], dropped: Arc<AtomicBool>) -> Self {
        Self {
            endless: Some(dropped),
            ..Self::new(chunks)
        }
    }

    fn record(&self, request: CompletionRequest) -> Result<(), Error> {
        self.calls.lock().unwrap().push(request);
        match &self.fail_with {
            Some((status, msg)) => Err(Error::Upstream {
                status: Some(*status),
                message: msg.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl CompletionService for MockCompletion {
    fn model(&self) -> &str {
        "mock-gpt"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, Error> {
        self.record(request)?;
        if let Some(msg) = &self.fail_mid_stream {
            return Err(Error::Upstream {
                status: None,
                message: msg.clone(),
            });
        }
        Ok(self.chunks.concat())
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<CompletionStream, Error> {
        self.record(request)?;

        let mut items = self
            .chunks
            .iter()
            .cloned()
            .map(Ok)
            .collect::<Vec<Result<String, Error>>>();
        if let Some(msg) = &self.fail_mid_stream {
            items.push(Err(Error::Upstream {
                status: None,
                message: msg.clone(),
            }));
        }

        let Some(dropped) = &self.endless else {
            return Ok(stream::iter(items).boxed());
        };

        let ticks = stream::unfold(SetOnDrop(dropped.clone()), |guard| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Some((Ok(" tick".to_string()), guard))
        });
        Ok(stream::iter(items).chain(ticks).boxed())
    }
}
