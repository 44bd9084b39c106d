pub mod anthropic;
pub mod models;
pub mod sse;

use anthropic::AnthropicProvider;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::LlmConfig;
use models::{ChatOptions, ChatResponse, Message};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network Error: {0}")]
    Network(String),
    #[error("API Error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Stream Error: {0}")]
    Stream(String),
    #[error("Invalid Response: {0}")]
    InvalidResponse(String),
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Rate Limited")]
    RateLimited,
}

impl LlmError {
    /// HTTP status reported by the provider, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            LlmError::Unauthorized(_) => Some(401),
            LlmError::RateLimited => Some(429),
            _ => None,
        }
    }

    /// The provider's own wording, without our variant prefix.
    pub fn provider_message(&self) -> String {
        match self {
            LlmError::Api { message, .. } => message.clone(),
            LlmError::Unauthorized(message) => message.clone(),
            LlmError::Network(message)
            | LlmError::Stream(message)
            | LlmError::InvalidResponse(message)
            | LlmError::NotConfigured(message) => message.clone(),
            LlmError::RateLimited => "rate limited".to_string(),
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(&self, messages: &[Message], options: ChatOptions) -> Result<ChatResponse, LlmError>;

    /// Sends each text fragment on `tx` as it arrives. Returns once the
    /// provider finishes or the receiving side has gone away.
    async fn chat_streaming(
        &self,
        messages: &[Message],
        options: ChatOptions,
        tx: Sender<String>,
    ) -> Result<(), LlmError>;
}

/// Builds providers from config.
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_default(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
        match config.provider.as_str() {
            "anthropic" => {
                let cfg = config.anthropic.as_ref().ok_or_else(|| {
                    LlmError::NotConfigured("missing llm.anthropic section".to_string())
                })?;
                if cfg.api_key.trim().is_empty() {
                    return Err(LlmError::NotConfigured(
                        "Missing ANTHROPIC_API_KEY environment variable".to_string(),
                    ));
                }
                Ok(Arc::new(AnthropicProvider::new(
                    cfg.api_key.clone(),
                    cfg.api_base.clone(),
                    cfg.default_model.clone(),
                )))
            }
            other => Err(LlmError::NotConfigured(format!("unknown provider '{}'", other))),
        }
    }
}

/// Process-wide generation client, built on first use and shared read-only
/// afterwards. Concurrent first callers race on the cell; exactly one
/// construction wins.
pub struct LazyProvider {
    config: Option<LlmConfig>,
    cell: OnceCell<Arc<dyn LlmProvider>>,
}

impl LazyProvider {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config: Some(config),
            cell: OnceCell::new(),
        }
    }

    /// Wraps an already constructed provider.
    pub fn ready(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            config: None,
            cell: OnceCell::from(provider),
        }
    }

    pub async fn get(&self) -> Result<Arc<dyn LlmProvider>, LlmError> {
        self.cell
            .get_or_try_init(|| async {
                let config = self.config.as_ref().ok_or_else(|| {
                    LlmError::NotConfigured("no provider configuration".to_string())
                })?;
                let provider = ProviderFactory::create_default(config)?;
                info!("Initialized LLM provider '{}'", provider.name());
                Ok::<_, LlmError>(provider)
            })
            .await
            .cloned()
    }
}
