use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{LlmClient, LlmError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// HTTP client for the Gemini generate API, streaming via server-sent events.
///
/// The credential is sent as a request header only; it is never logged and the
/// struct deliberately has no `Debug` derive.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    /// Create a new client against an explicit endpoint.
    pub fn new(base_url: &str, api_key: String, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
            timeout_secs,
        }
    }

    /// Client against the hosted endpoint with a 5-minute request timeout.
    pub fn with_key(api_key: String) -> Self {
        Self::new(DEFAULT_BASE_URL, api_key, 300)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Request body for `models/{model}:streamGenerateContent`
#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// One SSE `data:` payload from the streaming endpoint.
#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl StreamChunk {
    /// Concatenated text of all parts in this chunk.
    fn text(&self) -> String {
        self.candidates
            .iter()
            .flat_map(|c| c.content.parts.iter())
            .map(|p| p.text.as_str())
            .collect()
    }
}

impl LlmClient for GeminiClient {
    fn generate_streaming(
        &self,
        model: &str,
        prompt: &str,
        on_fragment: &mut dyn FnMut(&str),
    ) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        tracing::debug!(model, prompt_chars = prompt.len(), "streaming generation request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    LlmError::Timeout(self.timeout_secs)
                } else {
                    LlmError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let mut full_text = String::new();
        let reader = BufReader::new(response);
        for line in reader.lines() {
            let line = line.map_err(|e| LlmError::Http(e.to_string()))?;
            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };
            let payload = payload.trim();
            if payload.is_empty() {
                continue;
            }

            let chunk: StreamChunk = serde_json::from_str(payload)
                .map_err(|e| LlmError::StreamParsing(e.to_string()))?;
            let fragment = chunk.text();
            if fragment.is_empty() {
                continue;
            }

            on_fragment(&fragment);
            full_text.push_str(&fragment);
        }

        Ok(full_text)
    }
}

/// Mock generation client for testing — replays a configured fragment script.
pub struct MockLlmClient {
    fragments: Vec<String>,
    /// Fail mid-stream (after the first fragment) on the Nth call, 0-based.
    fail_on_call: Option<usize>,
    invocations: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            fail_on_call: None,
            invocations: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Make the Nth invocation (0-based) fail after yielding one fragment.
    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// How many generation calls were attempted.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }
}

impl LlmClient for MockLlmClient {
    fn generate_streaming(
        &self,
        _model: &str,
        prompt: &str,
        on_fragment: &mut dyn FnMut(&str),
    ) -> Result<String, LlmError> {
        let call = self.invocations.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());

        let mut full_text = String::new();
        for (index, fragment) in self.fragments.iter().enumerate() {
            if self.fail_on_call == Some(call) && index == 1 {
                return Err(LlmError::Http("mock stream failure".to_string()));
            }
            on_fragment(fragment);
            full_text.push_str(fragment);
        }
        Ok(full_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client = GeminiClient::new("https://example.test/v1/", "k".into(), 60);
        assert_eq!(client.base_url(), "https://example.test/v1");
    }

    #[test]
    fn with_key_uses_hosted_endpoint() {
        let client = GeminiClient::with_key("k".into());
        assert!(client.base_url().contains("generativelanguage.googleapis.com"));
    }

    #[test]
    fn request_body_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "analyze this" }],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "analyze this");
    }

    #[test]
    fn stream_chunk_concatenates_parts() {
        let chunk: StreamChunk = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Once "},{"text":"upon"}],"role":"model"},"index":0}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.text(), "Once upon");
    }

    #[test]
    fn stream_chunk_tolerates_missing_fields() {
        let chunk: StreamChunk = serde_json::from_str(r#"{"candidates":[{}]}"#).unwrap();
        assert_eq!(chunk.text(), "");

        let chunk: StreamChunk = serde_json::from_str("{}").unwrap();
        assert_eq!(chunk.text(), "");
    }

    #[test]
    fn mock_yields_fragments_in_order_and_returns_concatenation() {
        let client = MockLlmClient::new(&["One ", "two ", "three."]);
        let mut seen = Vec::new();
        let full = client
            .generate_streaming("m", "p", &mut |f| seen.push(f.to_string()))
            .unwrap();

        assert_eq!(seen, vec!["One ", "two ", "three."]);
        assert_eq!(full, "One two three.");
        assert_eq!(seen.concat(), full);
    }

    #[test]
    fn mock_failure_happens_mid_stream() {
        let client = MockLlmClient::new(&["partial ", "never seen"]).failing_on_call(0);
        let mut seen = Vec::new();
        let result = client.generate_streaming("m", "p", &mut |f| seen.push(f.to_string()));

        assert!(matches!(result, Err(LlmError::Http(_))));
        // One fragment escaped before the failure — callers must discard it
        assert_eq!(seen, vec!["partial "]);
    }

    #[test]
    fn mock_counts_invocations_and_records_prompts() {
        let client = MockLlmClient::new(&["x"]);
        assert_eq!(client.invocations(), 0);

        client.generate_streaming("m", "first", &mut |_| {}).unwrap();
        client.generate_streaming("m", "second", &mut |_| {}).unwrap();

        assert_eq!(client.invocations(), 2);
        assert_eq!(client.prompts(), vec!["first", "second"]);
    }

    #[test]
    fn mock_failure_only_on_configured_call() {
        let client = MockLlmClient::new(&["a", "b"]).failing_on_call(0);
        assert!(client.generate_streaming("m", "p", &mut |_| {}).is_err());
        // Next call succeeds
        assert_eq!(client.generate_streaming("m", "p", &mut |_| {}).unwrap(), "ab");
    }
}
