//! Ollama `/api/chat` client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use micarag_core::error::Error;
use micarag_core::traits::ChatModel;
use micarag_core::types::ChatMessage;

/// Non-streaming chat completions from a local Ollama server. Sampling is
/// fixed at temperature 0 and failed requests are not retried.
pub struct OllamaChat {
    client: Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaChat {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model: model.to_string(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_error(&self, e: &reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Generation(format!("no reply from {} within {} ms", self.endpoint, self.timeout.as_millis()))
        } else {
            Error::Generation(format!("request to {} failed: {e}", self.endpoint))
        }
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    async fn chat(&self, messages: &[ChatMessage]) -> micarag_core::Result<String> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: ChatOptions { temperature: 0.0 },
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("HTTP {status}: {}", body.trim())));
        }
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| if e.is_timeout() { self.request_error(&e) } else { Error::Generation(format!("malformed chat response: {e}")) })?;

        tracing::debug!(model = %self.model, elapsed_ms = start.elapsed().as_millis() as u64, "chat completion");
        Ok(body.message.content)
    }
}
