use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tokio::sync::mpsc::Sender;
use tracing::{debug, warn};

use crate::llm::sse::{data_payload, LineBuffer};
use crate::llm::{
    models::{ChatOptions, ChatResponse, Message, Usage},
    LlmError, LlmProvider,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

/// One decoded event from the Messages streaming API.
#[derive(Debug, PartialEq)]
enum StreamEvent {
    Text(String),
    Stop,
    Error(String),
    Ignored,
}

impl AnthropicProvider {
    pub fn new(api_key: String, base_url: String, default_model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model,
        }
    }

    fn request_body(&self, messages: &[Message], options: &ChatOptions, stream: bool) -> Value {
        let model = options.model.as_deref().unwrap_or(&self.default_model);

        // Anthropic requires the 'system' prompt as a separate field, and 'messages' handles role/content only for 'user'/'assistant'
        let mut system = String::new();
        let filtered_messages: Vec<&Message> = messages
            .iter()
            .filter(|m| {
                if m.role == "system" {
                    system.push_str(&m.content);
                    system.push('\n');
                    false
                } else {
                    true
                }
            })
            .collect();

        if let Some(opts_system) = &options.system_prompt {
            system.push_str(opts_system);
        }

        let mut body = json!({
            "model": model,
            "messages": filtered_messages,
            "max_tokens": options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });
        let system = system.trim();
        if !system.is_empty() {
            body["system"] = json!(system);
        }
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<Response, LlmError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = error_message(&text).unwrap_or_else(|| format!("Anthropic Error {}: {}", status, text));
        warn!("Anthropic request failed with {}: {}", status, message);

        Err(match status {
            StatusCode::UNAUTHORIZED => LlmError::Unauthorized(message),
            StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited,
            _ => LlmError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}

/// Pulls `error.message` out of an Anthropic error envelope.
fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json["error"]["message"].as_str().map(str::to_string)
}

fn parse_stream_event(data: &str) -> StreamEvent {
    let json: Value = match serde_json::from_str(data) {
        Ok(json) => json,
        Err(e) => {
            debug!("Skipping undecodable stream payload: {}", e);
            return StreamEvent::Ignored;
        }
    };

    match json["type"].as_str() {
        Some("content_block_delta") if json["delta"]["type"].as_str() == Some("text_delta") => json["delta"]["text"]
            .as_str()
            .map(|t| StreamEvent::Text(t.to_string()))
            .unwrap_or(StreamEvent::Ignored),
        Some("message_stop") => StreamEvent::Stop,
        Some("error") => StreamEvent::Error(
            json["error"]["message"]
                .as_str()
                .unwrap_or("stream error")
                .to_string(),
        ),
        _ => StreamEvent::Ignored,
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn chat(&self, messages: &[Message], options: ChatOptions) -> Result<ChatResponse, LlmError> {
        let body = self.request_body(messages, &options, false);
        let response = self.send(&body).await?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        // Only the text blocks carry the reply
        let content: String = json["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b["type"].as_str() == Some("text"))
                    .filter_map(|b| b["text"].as_str())
                    .collect()
            })
            .unwrap_or_default();

        let usage = json.get("usage").map(|u| Usage {
            input_tokens: u["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: u["output_tokens"].as_u64().unwrap_or(0) as u32,
        });

        let model = json["model"]
            .as_str()
            .map(str::to_string)
            .or(options.model)
            .unwrap_or_else(|| self.default_model.clone());

        Ok(ChatResponse { content, model, usage })
    }

    async fn chat_streaming(
        &self,
        messages: &[Message],
        options: ChatOptions,
        tx: Sender<String>,
    ) -> Result<(), LlmError> {
        let body = self.request_body(messages, &options, true);
        let response = self.send(&body).await?;

        let mut stream = response.bytes_stream();
        let mut lines = LineBuffer::new();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| LlmError::Network(e.to_string()))?;
            for line in lines.push(&bytes) {
                let Some(data) = data_payload(&line) else {
                    continue;
                };
                match parse_stream_event(data) {
                    StreamEvent::Text(text) => {
                        if tx.send(text).await.is_err() {
                            // Receiver dropped; dropping the body closes the upstream request.
                            debug!("Stream receiver closed, abandoning generation");
                            return Ok(());
                        }
                    }
                    StreamEvent::Stop => return Ok(()),
                    StreamEvent::Error(message) => return Err(LlmError::Stream(message)),
                    StreamEvent::Ignored => {}
                }
            }
        }

        if let Some(line) = lines.finish() {
            if let Some(data) = data_payload(&line) {
                match parse_stream_event(data) {
                    StreamEvent::Text(text) => {
                        let _ = tx.send(text).await;
                    }
                    StreamEvent::Stop => return Ok(()),
                    StreamEvent::Error(message) => return Err(LlmError::Stream(message)),
                    StreamEvent::Ignored => {}
                }
            }
        }

        // Without message_stop the reply is truncated
        warn!("Anthropic stream closed before message_stop");
        Err(LlmError::Stream("stream ended before message_stop".to_string()))
    }
}
