use std::sync::Arc;
use tracing::{error, info, warn};

use crate::comedy::single_flight::KeyedLocks;
use crate::comedy::{comedian_prompt, find_comedian, user_prompt};
use crate::config::ComedyConfig;
use crate::db::Store;
use crate::error::AppError;
use crate::llm::models::{ChatOptions, Message};
use crate::llm::LazyProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JokeSource {
    Cache,
    Generated,
}

#[derive(Debug, Clone)]
pub struct JokeOutcome {
    pub joke: String,
    pub source: JokeSource,
}

/// Cache-or-generate for (comedian, category) jokes.
pub struct JokeService {
    store: Arc<dyn Store>,
    llm: Arc<LazyProvider>,
    config: ComedyConfig,
    flights: KeyedLocks,
}

impl JokeService {
    pub fn new(store: Arc<dyn Store>, llm: Arc<LazyProvider>, config: ComedyConfig) -> Self {
        Self {
            store,
            llm,
            config,
            flights: KeyedLocks::new(),
        }
    }

    pub async fn get_or_generate(&self, comedian: &str, category: &str) -> Result<JokeOutcome, AppError> {
        if comedian.is_empty() || category.is_empty() {
            return Err(AppError::Validation("Comedian and category are required".to_string()));
        }

        if let Some(joke) = self.lookup(comedian, category).await {
            return Ok(JokeOutcome {
                joke,
                source: JokeSource::Cache,
            });
        }

        if !self.config.single_flight {
            return self.generate_and_store(comedian, category).await;
        }

        let key = format!("{}:{}", comedian, category);
        let _flight = self.flights.lock(&key).await;

        // Whoever held the key before us may have stored one already
        if let Some(joke) = self.lookup(comedian, category).await {
            return Ok(JokeOutcome {
                joke,
                source: JokeSource::Cache,
            });
        }

        self.generate_and_store(comedian, category).await
    }

    /// A lookup failure counts as a miss.
    async fn lookup(&self, comedian: &str, category: &str) -> Option<String> {
        match self.store.find_joke(comedian, category).await {
            Ok(found) => found.map(|j| j.content),
            Err(e) => {
                warn!(comedian, category, "Joke lookup failed, generating instead: {}", e);
                None
            }
        }
    }

    async fn generate_and_store(&self, comedian: &str, category: &str) -> Result<JokeOutcome, AppError> {
        if find_comedian(comedian).is_none() {
            warn!(comedian, "Unknown comedian, using the default voice");
        }

        let options = ChatOptions {
            max_tokens: Some(self.config.max_tokens),
            system_prompt: Some(comedian_prompt(comedian, category)),
            ..Default::default()
        };
        let messages = [Message::user(user_prompt(category))];

        let provider = self.llm.get().await.map_err(|e| {
            error!(comedian, category, "LLM provider unavailable: {}", e);
            AppError::from(e)
        })?;

        let response = provider.chat(&messages, options).await.map_err(|e| {
            error!(comedian, category, "Joke generation failed: {}", e);
            AppError::from(e)
        })?;

        if response.content.trim().is_empty() {
            error!(comedian, category, "Provider returned an empty joke");
            return Err(AppError::EmptyGeneration("Empty joke content from the generation service".to_string()));
        }

        if let Err(e) = self.store.insert_joke(comedian, category, &response.content).await {
            warn!(comedian, category, "Could not cache generated joke: {}", e);
        } else {
            info!(comedian, category, "Cached new joke");
        }

        Ok(JokeOutcome {
            joke: response.content,
            source: JokeSource::Generated,
        })
    }
}
