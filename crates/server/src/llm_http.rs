//! HTTP client for the configured chat provider. One prompt in, one
//! completion string out; failed attempts retry with a linear backoff up
//! to the configured limit. A malformed completion is not an error here,
//! the tolerant intent parser downstream absorbs it.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use comanda_agent::LlmClient;
use comanda_core::config::{LlmConfig, LlmProvider};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_COMPLETION_TOKENS: u32 = 1024;
const RETRY_BASE_DELAY_MS: u64 = 250;

pub struct HttpLlmClient {
    client: Client,
    provider: LlmProvider,
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl HttpLlmClient {
    pub fn new(client: Client, config: &LlmConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(config.provider).to_owned());
        Self {
            client,
            provider: config.provider,
            api_key: config.api_key.clone(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        }
    }

    async fn request_once(&self, system: &str, user: &str) -> Result<String> {
        let (path, body) = match self.provider {
            LlmProvider::OpenAi => (
                "/chat/completions",
                json!({
                    "model": self.model,
                    "temperature": 0,
                    "messages": [
                        { "role": "system", "content": system },
                        { "role": "user", "content": user },
                    ],
                }),
            ),
            LlmProvider::Anthropic => (
                "/v1/messages",
                json!({
                    "model": self.model,
                    "max_tokens": MAX_COMPLETION_TOKENS,
                    "system": system,
                    "messages": [{ "role": "user", "content": user }],
                }),
            ),
            LlmProvider::Ollama => (
                "/api/chat",
                json!({
                    "model": self.model,
                    "stream": false,
                    "messages": [
                        { "role": "system", "content": system },
                        { "role": "user", "content": user },
                    ],
                }),
            ),
        };

        let mut request = self.client.post(format!("{}{path}", self.base_url)).json(&body);
        if let Some(key) = &self.api_key {
            request = match self.provider {
                LlmProvider::Anthropic => request
                    .header("x-api-key", key.expose_secret())
                    .header("anthropic-version", ANTHROPIC_VERSION),
                _ => request.bearer_auth(key.expose_secret()),
            };
        }

        let response = request.send().await.context("llm request failed")?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("llm provider returned status {status}: {detail}"));
        }

        let payload: Value = response.json().await.context("llm response was not json")?;
        extract_completion(self.provider, &payload)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            match self.request_once(system, user).await {
                Ok(completion) => return Ok(completion),
                Err(error) => {
                    tracing::warn!(
                        event_name = "llm_attempt_failed",
                        attempt,
                        max_retries = self.max_retries,
                        error = %error,
                    );
                    last_error = Some(error);
                }
            }
            if attempt < self.max_retries {
                tokio::time::sleep(Duration::from_millis(
                    RETRY_BASE_DELAY_MS * u64::from(attempt + 1),
                ))
                .await;
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("llm retries exhausted")))
    }
}

fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => OPENAI_BASE_URL,
        LlmProvider::Anthropic => ANTHROPIC_BASE_URL,
        LlmProvider::Ollama => OLLAMA_BASE_URL,
    }
}

fn extract_completion(provider: LlmProvider, payload: &Value) -> Result<String> {
    let content = match provider {
        LlmProvider::OpenAi => payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str),
        LlmProvider::Anthropic => payload.pointer("/content/0/text").and_then(Value::as_str),
        LlmProvider::Ollama => payload.pointer("/message/content").and_then(Value::as_str),
    };
    content
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("llm response had no completion text"))
}
