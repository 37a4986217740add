//! Streaming client for an Ollama-style `/api/generate` endpoint.
//!
//! The request asks for `stream: true`; the response body is newline-delimited
//! JSON, one object per fragment:
//!
//! ```text
//! {"response": "{\"conf_", "done": false}
//! {"response": "name\": ...", "done": false}
//! {"response": "", "done": true}
//! ```
//!
//! Fragments are concatenated until one carries `done: true`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use super::{ChunkSink, TextGenerator, TransportError};

pub const DEFAULT_URL: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL: &str = "llama3.1";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize, Debug, Default)]
struct StreamFragment {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Splits a byte stream into complete lines.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            lines.push(line);
        }
        lines
    }

    /// Whatever is left after the stream closed without a final newline.
    fn finish(&mut self) -> Option<Vec<u8>> {
        if self.pending.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

/// Running concatenation of fragments.
#[derive(Default)]
struct Completion {
    text: String,
    done: bool,
}

impl Completion {
    fn apply_line(
        &mut self,
        line: &[u8],
        on_chunk: Option<&ChunkSink<'_>>,
    ) -> Result<(), TransportError> {
        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        let fragment: StreamFragment = serde_json::from_slice(line)
            .map_err(|e| TransportError::Fragment(e.to_string()))?;
        if let Some(err) = fragment.error {
            return Err(TransportError::Service(err));
        }
        if !fragment.response.is_empty() {
            if let Some(sink) = on_chunk {
                sink(&fragment.response);
            }
            self.text.push_str(&fragment.response);
        }
        self.done = fragment.done;
        Ok(())
    }
}

/// [`TextGenerator`] backed by a local Ollama server.
pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    timeout: Option<Duration>,
}

impl OllamaGenerator {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            model: model.into(),
            timeout: None,
        }
    }

    /// Bound each request, streaming body included. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_reqwest(&self, e: reqwest::Error) -> TransportError {
        match self.timeout {
            Some(t) if e.is_timeout() => TransportError::Timeout(t),
            _ => TransportError::Request(e.to_string()),
        }
    }

    async fn complete(
        &self,
        prompt: &str,
        on_chunk: Option<&ChunkSink<'_>>,
    ) -> Result<String, TransportError> {
        let mut request = self.client.post(&self.url).json(&GenerateRequest {
            model: &self.model,
            prompt,
            stream: true,
        });
        if let Some(t) = self.timeout {
            request = request.timeout(t);
        }

        let resp = request.send().await.map_err(|e| self.map_reqwest(e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let mut stream = resp.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut completion = Completion::default();

        'read: while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.map_reqwest(e))?;
            for line in lines.push(&chunk) {
                completion.apply_line(&line, on_chunk)?;
                if completion.done {
                    break 'read;
                }
            }
        }
        if !completion.done
            && let Some(rest) = lines.finish()
        {
            completion.apply_line(&rest, on_chunk)?;
        }
        if !completion.done {
            tracing::warn!(
                model = %self.model,
                chars = completion.text.len(),
                "generation stream closed before done flag"
            );
        }
        Ok(completion.text)
    }
}

impl TextGenerator for OllamaGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        on_chunk: Option<&'a ChunkSink<'a>>,
    ) -> Pin<Box<dyn Future<Output = Result<String, TransportError>> + Send + 'a>> {
        Box::pin(self.complete(prompt, on_chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn feed(parts: &[&[u8]]) -> Result<Completion, TransportError> {
        let mut lines = LineBuffer::default();
        let mut completion = Completion::default();
        for part in parts {
            for line in lines.push(part) {
                completion.apply_line(&line, None)?;
            }
        }
        if let Some(rest) = lines.finish() {
            completion.apply_line(&rest, None)?;
        }
        Ok(completion)
    }

    #[test]
    fn concatenates_fragments_until_done() {
        let c = feed(&[
            b"{\"response\":\"{\\\"conf_\",\"done\":false}\n",
            b"{\"response\":\"name\\\": 1}\",\"done\":false}\n{\"response\":\"\",\"done\":true}\n",
        ])
        .unwrap();
        assert!(c.done);
        assert_eq!(c.text, "{\"conf_name\": 1}");
    }

    #[test]
    fn fragment_split_across_chunks() {
        let c = feed(&[b"{\"respon", b"se\":\"ab\",\"do", b"ne\":true}\n"]).unwrap();
        assert!(c.done);
        assert_eq!(c.text, "ab");
    }

    #[test]
    fn trailing_line_without_newline() {
        let c = feed(&[b"{\"response\":\"x\",\"done\":false}\n{\"response\":\"y\",\"done\":true}"])
            .unwrap();
        assert!(c.done);
        assert_eq!(c.text, "xy");
    }

    #[test]
    fn blank_lines_ignored() {
        let c = feed(&[b"\n\r\n{\"response\":\"z\",\"done\":true}\n\n"]).unwrap();
        assert_eq!(c.text, "z");
    }

    #[test]
    fn garbage_fragment_is_transport_error() {
        assert!(matches!(
            feed(&[b"not json\n"]),
            Err(TransportError::Fragment(_))
        ));
    }

    #[test]
    fn service_error_fragment() {
        assert_eq!(
            feed(&[b"{\"error\":\"model not found\"}\n"]).err(),
            Some(TransportError::Service("model not found".into()))
        );
    }

    #[test]
    fn chunks_reach_sink_in_order() {
        let seen = Mutex::new(Vec::new());
        let sink: &ChunkSink<'_> = &|s: &str| seen.lock().unwrap().push(s.to_string());
        let mut c = Completion::default();
        c.apply_line(b"{\"response\":\"a\"}", Some(sink)).unwrap();
        c.apply_line(b"{\"response\":\"\"}", Some(sink)).unwrap();
        c.apply_line(b"{\"response\":\"b\",\"done\":true}", Some(sink))
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let generator = OllamaGenerator::new("http://127.0.0.1:9/api/generate", DEFAULT_MODEL)
            .with_timeout(Some(Duration::from_secs(2)));
        let err = generator.generate("hi", None).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Request(_) | TransportError::Timeout(_)
        ));
    }
}
