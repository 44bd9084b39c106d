//! Streaming chat relay: persists the user's turn, streams the persona's
//! reply back fragment by fragment, and stores the finished reply.

pub mod event;

pub use event::RelayEvent;

use futures_util::Stream;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{error, info, warn};

use crate::config::ChatConfig;
use crate::db::{Role, Store};
use crate::error::AppError;
use crate::llm::models::{ChatOptions, Message as LlmMessage};
use crate::llm::LazyProvider;
use crate::persona::PersonaCatalog;

pub type RelayStream = Pin<Box<dyn Stream<Item = RelayEvent> + Send>>;

const CHUNK_BUFFER: usize = 100;

/// A validated chat request.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub session_id: String,
    pub persona_id: String,
    pub message: String,
}

impl ChatTurn {
    pub fn new(
        session_id: Option<String>,
        persona_id: Option<String>,
        message: Option<String>,
    ) -> Result<Self, AppError> {
        match (session_id, persona_id, message) {
            (Some(session_id), Some(persona_id), Some(message))
                if !session_id.is_empty() && !persona_id.is_empty() && !message.is_empty() =>
            {
                Ok(Self {
                    session_id,
                    persona_id,
                    message,
                })
            }
            _ => Err(AppError::Validation("Missing required fields".to_string())),
        }
    }
}

/// Aborts the generation task if the response stream goes away first.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct ChatRelay {
    store: Arc<dyn Store>,
    llm: Arc<LazyProvider>,
    personas: Arc<PersonaCatalog>,
    config: ChatConfig,
}

impl ChatRelay {
    pub fn new(
        store: Arc<dyn Store>,
        llm: Arc<LazyProvider>,
        personas: Arc<PersonaCatalog>,
        config: ChatConfig,
    ) -> Self {
        Self {
            store,
            llm,
            personas,
            config,
        }
    }

    /// Everything up to opening the stream happens here, so failures before
    /// the first event can still become a plain error response.
    pub async fn start(&self, turn: ChatTurn) -> Result<RelayStream, AppError> {
        let system_prompt = self.personas.system_prompt(&turn.persona_id)?.to_string();

        if self.store.get_session(&turn.session_id).await?.is_none() {
            warn!(session_id = %turn.session_id, "Chat request for unknown session");
            return Err(AppError::NotFound("Session not found".to_string()));
        }

        let user_msg = self
            .store
            .insert_message(&turn.session_id, Role::User, &turn.message)
            .await
            .map_err(|e| {
                error!(session_id = %turn.session_id, "Failed to insert user message: {}", e);
                AppError::from(e)
            })?;

        let history = match self
            .store
            .recent_messages(&turn.session_id, self.config.history_fetch_limit)
            .await
        {
            Ok(msgs) => msgs,
            Err(e) => {
                warn!(session_id = %turn.session_id, "Failed to fetch history, continuing without it: {}", e);
                Vec::new()
            }
        };

        let mut llm_messages = context_window(
            history.into_iter().filter(|m| m.id != user_msg.id).map(|m| LlmMessage {
                role: if m.role == "user" { "user" } else { "assistant" }.to_string(),
                content: m.content,
            }),
            self.config.context_messages,
        );
        llm_messages.push(LlmMessage::user(turn.message));

        let options = ChatOptions {
            max_tokens: Some(self.config.max_tokens),
            system_prompt: Some(system_prompt),
            ..Default::default()
        };

        info!(
            session_id = %turn.session_id,
            persona_id = %turn.persona_id,
            context = llm_messages.len() - 1,
            "Opening chat stream"
        );

        Ok(relay_stream(
            self.store.clone(),
            self.llm.clone(),
            turn.session_id,
            llm_messages,
            options,
        ))
    }
}

/// The last `limit` messages, oldest first.
pub fn context_window<I>(messages: I, limit: usize) -> Vec<LlmMessage>
where
    I: IntoIterator<Item = LlmMessage>,
{
    let all: Vec<LlmMessage> = messages.into_iter().collect();
    let skip = all.len().saturating_sub(limit);
    all.into_iter().skip(skip).collect()
}

fn relay_stream(
    store: Arc<dyn Store>,
    llm: Arc<LazyProvider>,
    session_id: String,
    messages: Vec<LlmMessage>,
    options: ChatOptions,
) -> RelayStream {
    Box::pin(async_stream::stream! {
        let (tx, mut rx) = mpsc::channel::<String>(CHUNK_BUFFER);

        // Spawn the network request so we can listen to the chunk rx channel
        let generation = tokio::spawn(async move {
            match llm.get().await {
                Ok(provider) => provider.chat_streaming(&messages, options, tx).await,
                Err(e) => Err(e),
            }
        });
        let _abort = AbortOnDrop(generation.abort_handle());

        let mut full_response = String::new();
        while let Some(chunk) = rx.recv().await {
            full_response.push_str(&chunk);
            yield RelayEvent::content(chunk);
        }

        match generation.await {
            Ok(Ok(())) => {
                let reply = full_response.trim();
                if !reply.is_empty() {
                    if let Err(e) = store.insert_message(&session_id, Role::Assistant, reply).await {
                        error!(session_id = %session_id, "Failed to save assistant reply: {}", e);
                    }
                }
                yield RelayEvent::Done;
            }
            Ok(Err(e)) => {
                error!(session_id = %session_id, status = ?e.status(), "LLM Streaming Error: {}", e);
                yield RelayEvent::from_llm_error(&e);
            }
            Err(e) => {
                error!(session_id = %session_id, "Generation task failed: {}", e);
                yield RelayEvent::Error {
                    error: "Generation service error".to_string(),
                    details: Some(e.to_string()),
                    status: None,
                };
            }
        }
    })
}
