//! Scripted generator for tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{ChunkSink, TextGenerator, TransportError};

/// A configurable mock response for [`MockGenerator`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Completion delivered as these fragments, in order.
    Chunks(Vec<String>),
    /// Transport failure.
    Fail(TransportError),
}

impl MockResponse {
    pub fn text(s: &str) -> Self {
        MockResponse::Chunks(vec![s.to_string()])
    }
}

/// Hand-rolled [`TextGenerator`] returning scripted responses.
///
/// A sequence of responses is consumed one per call; once exhausted the last
/// one repeats. Calls and prompts are recorded.
pub struct MockGenerator {
    responses: Mutex<Vec<MockResponse>>,
    fallback: MockResponse,
    delay: Option<Duration>,
    call_count: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new(response: MockResponse) -> Self {
        Self::with_sequence(vec![response])
    }

    pub fn with_sequence(mut responses: Vec<MockResponse>) -> Self {
        assert!(
            !responses.is_empty(),
            "sequence must have at least one response"
        );
        responses.reverse();
        let fallback = responses.first().cloned().unwrap();
        Self {
            responses: Mutex::new(responses),
            fallback,
            delay: None,
            call_count: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn next_response(&self) -> MockResponse {
        self.responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        on_chunk: Option<&'a ChunkSink<'a>>,
    ) -> Pin<Box<dyn Future<Output = Result<String, TransportError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let response = self.next_response();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            match response {
                MockResponse::Chunks(chunks) => {
                    let mut text = String::new();
                    for chunk in &chunks {
                        if let Some(sink) = on_chunk {
                            sink(chunk);
                        }
                        text.push_str(chunk);
                    }
                    Ok(text)
                }
                MockResponse::Fail(e) => Err(e),
            }
        })
    }
}
