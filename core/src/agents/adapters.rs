//! Per-dialect translation between "send a prompt, get text back" and the
//! request/response envelopes of each provider family.
//!
//! Adapters fail on transport problems (connection errors, non-2xx status)
//! and on bodies that are not JSON at all. A JSON body that merely lacks the
//! expected text field yields an empty string; judging whether that text is
//! usable is the interpreter's job.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::Level;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use super::config::{DispatcherSettings, ProviderDescriptor};
use super::providers::WireDialect;
use crate::errors::DiagnosisError;
use crate::logging::log_event;

pub const TEMPERATURE: f64 = 0.3;
pub const MAX_TOKENS: u32 = 1000;
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One capability: deliver `prompt` to `provider` and return its raw text.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn send(
        &self,
        provider: &ProviderDescriptor,
        prompt: &str,
        secret: &str,
    ) -> Result<String, DiagnosisError>;
}

/// Shared HTTP client used by all real adapters.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(settings: &DispatcherSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(settings.user_agent.clone())
            .build()
            .context("failed to construct HTTP client")?;
        Ok(Self { client })
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    async fn send_json(
        &self,
        provider: &ProviderDescriptor,
        request: RequestBuilder,
    ) -> Result<Value, DiagnosisError> {
        log_event(
            Level::Debug,
            None,
            "dx.adapter",
            "Sending provider request",
            None,
            Some(json!({
                "provider": provider.id,
                "model": provider.model_name,
                "dialect": provider.dialect(),
            })),
        );
        let response = request
            .send()
            .await
            .map_err(|err| DiagnosisError::Connection(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiagnosisError::Transport {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        let body = response
            .text()
            .await
            .map_err(|err| DiagnosisError::Connection(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| DiagnosisError::MalformedResponse(err.to_string()))
    }
}

/// OpenAI-style chat completions (OpenAI, DeepSeek).
pub struct ChatCompletionAdapter {
    transport: HttpTransport,
}

/// Anthropic-style message blocks.
pub struct MessageBlockAdapter {
    transport: HttpTransport,
}

/// Google-style generative content; the key travels as a query parameter.
pub struct GenerativeContentAdapter {
    transport: HttpTransport,
}

/// DashScope-style task input.
pub struct TaskInputAdapter {
    transport: HttpTransport,
}

#[async_trait]
impl ProviderAdapter for ChatCompletionAdapter {
    async fn send(
        &self,
        provider: &ProviderDescriptor,
        prompt: &str,
        secret: &str,
    ) -> Result<String, DiagnosisError> {
        let request = self
            .transport
            .post(&provider.endpoint)
            .bearer_auth(secret)
            .json(&chat_completion_payload(&provider.model_name, prompt));
        let body = self.transport.send_json(provider, request).await?;
        Ok(extract_chat_completion(&body))
    }
}

#[async_trait]
impl ProviderAdapter for MessageBlockAdapter {
    async fn send(
        &self,
        provider: &ProviderDescriptor,
        prompt: &str,
        secret: &str,
    ) -> Result<String, DiagnosisError> {
        let request = self
            .transport
            .post(&provider.endpoint)
            .header("x-api-key", secret)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&message_block_payload(&provider.model_name, prompt));
        let body = self.transport.send_json(provider, request).await?;
        Ok(extract_message_block(&body))
    }
}

#[async_trait]
impl ProviderAdapter for GenerativeContentAdapter {
    async fn send(
        &self,
        provider: &ProviderDescriptor,
        prompt: &str,
        secret: &str,
    ) -> Result<String, DiagnosisError> {
        let request = self
            .transport
            .post(&provider.endpoint)
            .query(&[("key", secret)])
            .json(&generative_content_payload(prompt));
        let body = self.transport.send_json(provider, request).await?;
        Ok(extract_generative_content(&body))
    }
}

#[async_trait]
impl ProviderAdapter for TaskInputAdapter {
    async fn send(
        &self,
        provider: &ProviderDescriptor,
        prompt: &str,
        secret: &str,
    ) -> Result<String, DiagnosisError> {
        let request = self
            .transport
            .post(&provider.endpoint)
            .bearer_auth(secret)
            .json(&task_input_payload(&provider.model_name, prompt));
        let body = self.transport.send_json(provider, request).await?;
        Ok(extract_task_input(&body))
    }
}

pub fn chat_completion_payload(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "messages": [{ "role": "user", "content": prompt }],
        "temperature": TEMPERATURE,
        "max_tokens": MAX_TOKENS,
    })
}

pub fn message_block_payload(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "max_tokens": MAX_TOKENS,
        "messages": [{ "role": "user", "content": prompt }],
    })
}

pub fn generative_content_payload(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "temperature": TEMPERATURE,
            "maxOutputTokens": MAX_TOKENS,
        },
    })
}

pub fn task_input_payload(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "input": { "messages": [{ "role": "user", "content": prompt }] },
        "parameters": {
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        },
    })
}

pub fn extract_chat_completion(body: &Value) -> String {
    text_at(body.pointer("/choices/0/message/content"))
}

pub fn extract_message_block(body: &Value) -> String {
    text_at(body.pointer("/content/0/text"))
}

pub fn extract_generative_content(body: &Value) -> String {
    text_at(body.pointer("/candidates/0/content/parts/0/text"))
}

pub fn extract_task_input(body: &Value) -> String {
    text_at(body.pointer("/output/text"))
}

fn text_at(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// One adapter per wire dialect. The exhaustive match in
/// [`AdapterSet::for_dialect`] keeps the id → dialect → adapter chain checked
/// by the compiler.
#[derive(Clone)]
pub struct AdapterSet {
    chat_completion: Arc<dyn ProviderAdapter>,
    message_block: Arc<dyn ProviderAdapter>,
    generative_content: Arc<dyn ProviderAdapter>,
    task_input: Arc<dyn ProviderAdapter>,
}

impl AdapterSet {
    /// Real HTTP adapters sharing one client.
    pub fn http(settings: &DispatcherSettings) -> Result<Self> {
        let transport = HttpTransport::new(settings)?;
        Ok(Self {
            chat_completion: Arc::new(ChatCompletionAdapter {
                transport: transport.clone(),
            }),
            message_block: Arc::new(MessageBlockAdapter {
                transport: transport.clone(),
            }),
            generative_content: Arc::new(GenerativeContentAdapter {
                transport: transport.clone(),
            }),
            task_input: Arc::new(TaskInputAdapter { transport }),
        })
    }

    /// The same adapter for every dialect; handy for fakes.
    pub fn uniform(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            chat_completion: adapter.clone(),
            message_block: adapter.clone(),
            generative_content: adapter.clone(),
            task_input: adapter,
        }
    }

    pub fn with_adapter(mut self, dialect: WireDialect, adapter: Arc<dyn ProviderAdapter>) -> Self {
        match dialect {
            WireDialect::ChatCompletion => self.chat_completion = adapter,
            WireDialect::MessageBlock => self.message_block = adapter,
            WireDialect::GenerativeContent => self.generative_content = adapter,
            WireDialect::TaskInput => self.task_input = adapter,
        }
        self
    }

    pub fn for_dialect(&self, dialect: WireDialect) -> &dyn ProviderAdapter {
        match dialect {
            WireDialect::ChatCompletion => self.chat_completion.as_ref(),
            WireDialect::MessageBlock => self.message_block.as_ref(),
            WireDialect::GenerativeContent => self.generative_content.as_ref(),
            WireDialect::TaskInput => self.task_input.as_ref(),
        }
    }
}
