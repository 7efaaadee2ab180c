use crate::chat_proxy::{ChatConfig, FragmentStream, StreamingChatClient};
use crate::error::{Error, Result};
use crate::models::*;
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;

pub struct GeminiService {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    idle_timeout: Duration,
}

impl GeminiService {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Misconfigured("Server API Key not configured".to_string()))?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Misconfigured(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            idle_timeout: config.idle_timeout,
        })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[async_trait]
impl StreamingChatClient for GeminiService {
    async fn stream_generate(&self, prompt: String) -> Result<FragmentStream> {
        let request = GeminiRequest::from_prompt(prompt);

        let response = self
            .client
            .post(self.stream_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ChatUnavailable(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::ChatUnavailable(format!(
                "Gemini API error: HTTP {} - {}",
                status, error_text
            )));
        }

        let idle_timeout = self.idle_timeout;
        let mut body = response.bytes_stream();

        Ok(Box::pin(stream! {
            let mut decoder = SseDecoder::default();
            let mut fragments = 0usize;
            let mut failed = false;

            'read: loop {
                let chunk = match tokio::time::timeout(idle_timeout, body.next()).await {
                    Err(_) => {
                        yield Err(Error::ChatUnavailable(format!(
                            "no model output for {} seconds",
                            idle_timeout.as_secs()
                        )));
                        failed = true;
                        break 'read;
                    }
                    Ok(None) => break 'read,
                    Ok(Some(Err(e))) => {
                        yield Err(Error::ChatUnavailable(e.without_url().to_string()));
                        failed = true;
                        break 'read;
                    }
                    Ok(Some(Ok(chunk))) => chunk,
                };

                for event in decoder.push(&chunk) {
                    match decode_event(&event) {
                        Ok(Some(text)) => {
                            fragments += 1;
                            yield Ok(text);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            failed = true;
                            break 'read;
                        }
                    }
                }
            }

            if !failed {
                if let Some(event) = decoder.finish() {
                    match decode_event(&event) {
                        Ok(Some(text)) => {
                            fragments += 1;
                            yield Ok(text);
                        }
                        Ok(None) => {}
                        Err(e) => yield Err(e),
                    }
                }
                log::info!("Chat stream finished after {} fragments", fragments);
            } else {
                log::error!("Chat stream aborted after {} fragments", fragments);
            }
        }))
    }
}

/// Turns one SSE `data` payload into an answer fragment, skipping empty ones.
fn decode_event(data: &str) -> Result<Option<String>> {
    if data == "[DONE]" {
        return Ok(None);
    }

    let response: GeminiResponse = serde_json::from_str(data)
        .map_err(|e| Error::ChatUnavailable(format!("malformed stream chunk: {}", e)))?;

    if let Some(error) = response.error {
        return Err(Error::ChatUnavailable(format!(
            "Gemini API error {}: {}",
            error.code, error.message
        )));
    }

    let text = response.text();
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Incremental server-sent-events decoder yielding the `data` of each event.
#[derive(Debug, Default)]
struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
            if let Some(event) = self.accept_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes an event left open when the body ended without a blank line.
    fn finish(mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&rest).into_owned();
            if let Some(event) = self.accept_line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.accept_line("")
    }

    fn accept_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            let event = self.data.join("\n");
            self.data.clear();
            return Some(event);
        }

        if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        None
    }
}
